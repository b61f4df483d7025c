//! Scan-import pipeline integration tests
//!
//! Exercises the full staging workflow against a temp database with fake
//! external providers: duplicate detection, the promote transaction's
//! all-or-nothing behavior, and author resolution during promotion.

mod helpers;

use std::sync::Arc;
use tempfile::TempDir;

use obm_api::db::{authors, books, scanned, sequences};
use obm_api::import::{AuthorSelection, ImportPipeline, ManualEntry, PromoteRequest};
use obm_common::db::ScanStatus;
use obm_common::{DuplicateKind, Error};

fn pipeline_with(
    pool: &sqlx::SqlitePool,
    dir: &TempDir,
    metadata: helpers::FakeMetadata,
) -> ImportPipeline {
    ImportPipeline::new(
        pool.clone(),
        Arc::new(metadata),
        Arc::new(helpers::NoCovers),
        helpers::covers_dir(dir),
    )
}

fn promote_request(authors: Vec<AuthorSelection>) -> PromoteRequest {
    PromoteRequest {
        title: "The Passage".to_string(),
        subtitle: None,
        year: Some(2010),
        isbn: None,
        publisher: Some("Ballantine Books".to_string()),
        language: Some("en".to_string()),
        notes: None,
        pages: None,
        code_category: "PH".to_string(),
        code_maincategory: "WR".to_string(),
        authors,
    }
}

#[tokio::test]
async fn scan_stages_a_pending_record() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let ctx = helpers::test_context();

    // Raw input with separators normalizes before the lookup
    let record = pipeline.scan(&ctx, "978-0-316-06652-5").await.unwrap();
    assert_eq!(record.isbn, "9780316066525");
    assert_eq!(record.title, "The Passage");
    assert_eq!(record.authors_raw.as_deref(), Some("Justin Cronin"));
    assert_eq!(record.status, ScanStatus::Pending);

    let stored = scanned::get_scanned(&pool, record.id).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn rescanning_same_isbn_is_already_scanned() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let ctx = helpers::test_context();

    pipeline.scan(&ctx, "9780316066525").await.unwrap();
    let err = pipeline.scan(&ctx, "978-0-316-06652-5").await.unwrap_err();
    match err {
        Error::Duplicate { kind, .. } => assert_eq!(kind, DuplicateKind::AlreadyScanned),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn scanning_a_catalogued_isbn_reports_the_existing_book() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    helpers::seed_taxonomy(&pool).await;

    let author = authors::create_author(&pool, "Justin", "Cronin").await.unwrap();
    let input = books::BookInput {
        title: "The Passage".to_string(),
        subtitle: None,
        year: Some(2010),
        isbn: Some("9780316066525".to_string()),
        publisher: None,
        language: None,
        notes: None,
        pages: None,
        cover_image: None,
        code_category: "PH".to_string(),
        code_maincategory: "WR".to_string(),
    };
    let existing = books::create_book(&pool, &input, &[author.id]).await.unwrap();

    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let err = pipeline
        .scan(&helpers::test_context(), "9780316066525")
        .await
        .unwrap_err();
    match err {
        Error::Duplicate { kind, existing: book, .. } => {
            assert_eq!(kind, DuplicateKind::AlreadyInCollection);
            let book = book.expect("existing book identity missing");
            assert_eq!(book.id, existing.id);
            assert_eq!(book.title, "The Passage");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unknown_isbn_degrades_to_not_found() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    let pipeline = pipeline_with(&pool, &dir, helpers::FakeMetadata::empty());

    let err = pipeline
        .scan(&helpers::test_context(), "9780316066525")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn malformed_isbn_rejected_before_any_lookup() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    let pipeline = pipeline_with(&pool, &dir, helpers::FakeMetadata::empty());

    let err = pipeline
        .scan(&helpers::test_context(), "not-an-isbn")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn promote_end_to_end_first_book_gets_tag_0001() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    helpers::seed_taxonomy(&pool).await;

    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let ctx = helpers::test_context();

    let staged = pipeline.scan(&ctx, "9780316066525").await.unwrap();
    let request = promote_request(vec![AuthorSelection::New {
        first_name: "Justin".to_string(),
        last_name: "Cronin".to_string(),
    }]);
    let book = pipeline.promote(&ctx, staged.id, request).await.unwrap();

    assert_eq!(book.tag(), "WR PH 0001");
    assert_eq!(book.isbn.as_deref(), Some("9780316066525"));

    // Author created and linked
    let linked = books::get_book_authors(&pool, book.id).await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].last_name, "Cronin");

    // Staging row gone, counter advanced by exactly one
    assert!(scanned::get_scanned(&pool, staged.id).await.unwrap().is_none());
    assert_eq!(sequences::peek_next(&pool, "PH", "WR").await.unwrap(), 2);
}

#[tokio::test]
async fn promote_reuses_existing_author_without_duplicating() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    helpers::seed_taxonomy(&pool).await;
    let cronin = authors::create_author(&pool, "Justin", "Cronin").await.unwrap();

    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let ctx = helpers::test_context();

    let staged = pipeline.scan(&ctx, "9780316066525").await.unwrap();
    let request = promote_request(vec![AuthorSelection::Existing { existing_id: cronin.id }]);
    let book = pipeline.promote(&ctx, staged.id, request).await.unwrap();

    let linked = books::get_book_authors(&pool, book.id).await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, cronin.id);

    let author_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(author_count, 1);
}

#[tokio::test]
async fn promote_with_invalid_category_leaves_staging_untouched() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    helpers::seed_taxonomy(&pool).await;

    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let ctx = helpers::test_context();
    let staged = pipeline.scan(&ctx, "9780316066525").await.unwrap();

    let mut request = promote_request(vec![AuthorSelection::New {
        first_name: "Justin".to_string(),
        last_name: "Cronin".to_string(),
    }]);
    request.code_category = "ZZ".to_string();

    let err = pipeline.promote(&ctx, staged.id, request).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // Nothing happened: staging intact, no book, no author, counter unmoved
    let still_staged = scanned::get_scanned(&pool, staged.id).await.unwrap().unwrap();
    assert_eq!(still_staged.status, ScanStatus::Pending);
    let book_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(book_count, 0);
    let author_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(author_count, 0);
    assert_eq!(sequences::peek_next(&pool, "ZZ", "WR").await.unwrap(), 1);
}

#[tokio::test]
async fn promote_without_authors_is_rejected_before_writes() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    helpers::seed_taxonomy(&pool).await;

    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let ctx = helpers::test_context();
    let staged = pipeline.scan(&ctx, "9780316066525").await.unwrap();

    let err = pipeline
        .promote(&ctx, staged.id, promote_request(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(scanned::get_scanned(&pool, staged.id).await.unwrap().is_some());
}

#[tokio::test]
async fn promote_of_unknown_staging_row_is_not_found() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    helpers::seed_taxonomy(&pool).await;
    let pipeline = pipeline_with(&pool, &dir, helpers::FakeMetadata::empty());

    let err = pipeline
        .promote(
            &helpers::test_context(),
            uuid::Uuid::new_v4(),
            promote_request(vec![AuthorSelection::New {
                first_name: String::new(),
                last_name: "Cronin".to_string(),
            }]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn skip_unskip_and_delete_lifecycle() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    let pipeline = pipeline_with(
        &pool,
        &dir,
        helpers::FakeMetadata::with_book("9780316066525", helpers::passage_metadata()),
    );
    let ctx = helpers::test_context();
    let staged = pipeline.scan(&ctx, "9780316066525").await.unwrap();

    pipeline.skip(staged.id).await.unwrap();
    pipeline.skip(staged.id).await.unwrap();
    assert_eq!(
        scanned::get_scanned(&pool, staged.id).await.unwrap().unwrap().status,
        ScanStatus::Skipped
    );

    pipeline.unskip(staged.id).await.unwrap();
    assert_eq!(
        scanned::get_scanned(&pool, staged.id).await.unwrap().unwrap().status,
        ScanStatus::Pending
    );

    pipeline.delete(staged.id).await.unwrap();
    assert!(scanned::get_scanned(&pool, staged.id).await.unwrap().is_none());
    // Deleting again reports not found
    assert!(matches!(
        pipeline.delete(staged.id).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn manual_entry_stages_without_external_fetch_and_promotes_without_isbn() {
    let dir = TempDir::new().unwrap();
    let pool = helpers::test_database(&dir).await;
    helpers::seed_taxonomy(&pool).await;
    let pipeline = pipeline_with(&pool, &dir, helpers::FakeMetadata::empty());
    let ctx = helpers::test_context();

    let staged = pipeline
        .add_manual(
            &ctx,
            ManualEntry {
                title: "Samizdat Notebook".to_string(),
                subtitle: None,
                authors_raw: "Anna Klein".to_string(),
                published_year: None,
                publisher: None,
                pages: None,
                language: None,
                description: None,
            },
        )
        .await
        .unwrap();
    assert!(staged.isbn.starts_with("MANUAL-"));
    assert_eq!(staged.status, ScanStatus::Pending);

    let mut request = promote_request(vec![AuthorSelection::New {
        first_name: "Anna".to_string(),
        last_name: "Klein".to_string(),
    }]);
    request.title = "Samizdat Notebook".to_string();
    let book = pipeline.promote(&ctx, staged.id, request).await.unwrap();

    // The placeholder ISBN does not leak into the catalog
    assert_eq!(book.isbn, None);
    assert_eq!(book.tag(), "WR PH 0001");
}
