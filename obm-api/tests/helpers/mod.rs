//! Shared test fixtures: temp databases, fake providers, seeded taxonomy
#![allow(dead_code)]

use async_trait::async_trait;
use obm_common::config::{Config, PaginationConfig};
use obm_common::db::Principal;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

use obm_api::context::RequestContext;
use obm_api::providers::{BookMetadata, CoverSource, MetadataProvider};

/// Metadata provider backed by a fixed ISBN map
pub struct FakeMetadata {
    pub books: HashMap<String, BookMetadata>,
}

impl FakeMetadata {
    pub fn empty() -> Self {
        Self {
            books: HashMap::new(),
        }
    }

    pub fn with_book(isbn: &str, metadata: BookMetadata) -> Self {
        let mut books = HashMap::new();
        books.insert(isbn.to_string(), metadata);
        Self { books }
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    fn name(&self) -> &'static str {
        "fake-metadata"
    }

    async fn lookup(&self, isbn: &str) -> Option<BookMetadata> {
        self.books.get(isbn).cloned()
    }
}

/// Cover source that never has anything
pub struct NoCovers;

#[async_trait]
impl CoverSource for NoCovers {
    fn name(&self) -> &'static str {
        "no-covers"
    }

    async fn cover_url(&self, _isbn: &str) -> Option<String> {
        None
    }
}

/// Standard staged-book metadata used across tests
pub fn passage_metadata() -> BookMetadata {
    BookMetadata {
        title: "The Passage".to_string(),
        subtitle: None,
        authors: vec!["Justin Cronin".to_string()],
        published_year: Some(2010),
        publisher: Some("Ballantine Books".to_string()),
        pages: Some(766),
        language: Some("en".to_string()),
        description: None,
        cover_url: None,
    }
}

/// File-backed pool in a temp dir (shared across pool connections)
pub async fn test_database(dir: &TempDir) -> SqlitePool {
    let db_path = dir.path().join("obm-test.db");
    obm_common::db::init_database(&db_path)
        .await
        .expect("Failed to initialize test database")
}

pub fn covers_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("covers")
}

pub fn test_config(dir: &TempDir) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        database_path: dir.path().join("obm-test.db"),
        covers_dir: covers_dir(dir),
        google_books_api_key: None,
        pagination: PaginationConfig::default(),
    }
}

pub fn test_context() -> RequestContext {
    RequestContext {
        principal: Principal {
            user_id: Uuid::new_v4(),
            username: "tester".to_string(),
        },
        token: "test-token".to_string(),
    }
}

/// Seed the WR main category with PH and KL subcategories
pub async fn seed_taxonomy(pool: &SqlitePool) {
    obm_api::db::categories::create_maincategory(pool, "WR", "Western Literature")
        .await
        .unwrap();
    obm_api::db::categories::create_category(pool, "PH", "WR", "Philosophy")
        .await
        .unwrap();
    obm_api::db::categories::create_category(pool, "KL", "WR", "Classics")
        .await
        .unwrap();
}
