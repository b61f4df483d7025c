//! Concurrency properties of the sequence allocator
//!
//! Numbers for one category pair must come out distinct and gap-free even
//! when allocations race, and counters for different pairs must not
//! interfere.

mod helpers;

use std::collections::HashSet;
use tempfile::TempDir;
use tokio::task::JoinSet;

use obm_api::db::sequences;

#[tokio::test]
async fn concurrent_allocations_yield_distinct_contiguous_numbers() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;

    const TASKS: usize = 20;
    let mut join_set = JoinSet::new();
    for _ in 0..TASKS {
        let pool = pool.clone();
        join_set.spawn(async move {
            let mut tx = pool.begin().await.expect("begin failed");
            let number = sequences::allocate_next(&mut tx, "PH", "WR")
                .await
                .expect("allocation failed");
            tx.commit().await.expect("commit failed");
            number
        });
    }

    let mut numbers = Vec::new();
    while let Some(result) = join_set.join_next().await {
        numbers.push(result.expect("task panicked"));
    }

    let distinct: HashSet<i64> = numbers.iter().copied().collect();
    assert_eq!(distinct.len(), TASKS, "duplicate numbers handed out: {numbers:?}");

    // No rollbacks happened, so the sequence is exactly 1..=TASKS
    let expected: HashSet<i64> = (1..=TASKS as i64).collect();
    assert_eq!(distinct, expected, "unexpected number set: {numbers:?}");
}

#[tokio::test]
async fn racing_categories_do_not_interfere() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;

    const PER_CATEGORY: usize = 10;
    let mut join_set = JoinSet::new();
    for pair in [("PH", "WR"), ("KL", "WR"), ("PH", "SF")] {
        for _ in 0..PER_CATEGORY {
            let pool = pool.clone();
            join_set.spawn(async move {
                let mut tx = pool.begin().await.expect("begin failed");
                let number = sequences::allocate_next(&mut tx, pair.0, pair.1)
                    .await
                    .expect("allocation failed");
                tx.commit().await.expect("commit failed");
                (pair, number)
            });
        }
    }

    let mut per_pair: std::collections::HashMap<(&str, &str), HashSet<i64>> = Default::default();
    while let Some(result) = join_set.join_next().await {
        let (pair, number) = result.expect("task panicked");
        assert!(
            per_pair.entry(pair).or_default().insert(number),
            "pair {pair:?} handed out {number} twice"
        );
    }

    let expected: HashSet<i64> = (1..=PER_CATEGORY as i64).collect();
    for (pair, numbers) in per_pair {
        assert_eq!(numbers, expected, "pair {pair:?} skipped or repeated numbers");
    }
}

#[tokio::test]
async fn aborted_allocations_leave_later_numbers_increasing() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;

    // Commit, roll back, commit: the rolled-back allocation is reissued,
    // committed numbers never repeat
    let mut tx = pool.begin().await.unwrap();
    let first = sequences::allocate_next(&mut tx, "PH", "WR").await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let aborted = sequences::allocate_next(&mut tx, "PH", "WR").await.unwrap();
    tx.rollback().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let second = sequences::allocate_next(&mut tx, "PH", "WR").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first, 1);
    assert_eq!(aborted, 2);
    assert_eq!(second, 2);
    assert_eq!(sequences::peek_next(&pool, "PH", "WR").await.unwrap(), 3);
}
