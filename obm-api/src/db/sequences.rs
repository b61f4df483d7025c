//! Per-category tag sequence allocator
//!
//! Each (subcategory, main category) pair owns a counter row in
//! category_sequences. Numbers are handed out atomically, monotonically,
//! and are never reused: deleting books leaves gaps, re-categorizing a book
//! abandons its old number. The counter outlives every individual book.

use obm_common::Result;
use sqlx::{SqliteConnection, SqlitePool};

/// Atomically allocate the next number for a category pair
///
/// Runs on the caller's connection so the increment joins the surrounding
/// transaction: if the book insert it numbers rolls back, so does the
/// allocation. The upsert-increment is a single statement, so concurrent
/// allocations for the same pair serialize on that row without any
/// table-level coordination.
pub async fn allocate_next(
    conn: &mut SqliteConnection,
    code_category: &str,
    code_maincategory: &str,
) -> Result<i64> {
    let number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO category_sequences (code_category, code_maincategory, next_number)
        VALUES (?, ?, 1)
        ON CONFLICT(code_category, code_maincategory)
            DO UPDATE SET next_number = next_number + 1
        RETURNING next_number
        "#,
    )
    .bind(code_category)
    .bind(code_maincategory)
    .fetch_one(conn)
    .await?;

    Ok(number)
}

/// Preview the number the next allocation would return, without mutating
///
/// The result may be stale by the time the real allocation happens; it is
/// a UI hint, not a reservation.
pub async fn peek_next(
    pool: &SqlitePool,
    code_category: &str,
    code_maincategory: &str,
) -> Result<i64> {
    let current: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT next_number FROM category_sequences
        WHERE code_category = ? AND code_maincategory = ?
        "#,
    )
    .bind(code_category)
    .bind(code_maincategory)
    .fetch_optional(pool)
    .await?;

    Ok(current.map_or(1, |n| n + 1))
}
