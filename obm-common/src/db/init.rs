//! Database initialization
//!
//! Opens (or creates) the SQLite catalog database and applies the schema.
//! All `create_*_table` functions are idempotent and safe to call on every
//! startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Apply connection pragmas
///
/// WAL allows concurrent readers while an import transaction holds the
/// write lock; busy_timeout covers the brief contention window on the
/// category_sequences row.
pub async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;
    Ok(())
}

/// Run all table creation statements (idempotent)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_maincategories_table(pool).await?;
    create_categories_table(pool).await?;
    create_category_sequences_table(pool).await?;
    create_authors_table(pool).await?;
    create_books_table(pool).await?;
    create_book_author_table(pool).await?;
    create_scanned_books_table(pool).await?;
    create_wishlist_table(pool).await?;
    Ok(())
}

pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_digest TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_maincategories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS maincategories (
            code TEXT PRIMARY KEY CHECK (length(code) = 2),
            title TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Subcategory codes are unique only within their main category
pub async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            code TEXT NOT NULL CHECK (length(code) = 2),
            code_maincategory TEXT NOT NULL REFERENCES maincategories(code),
            title TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (code, code_maincategory)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Per-category tag counter
///
/// next_number holds the last number handed out; it only ever grows, even
/// when books are deleted. Tags are permanent identifiers, not dense
/// indices.
pub async fn create_category_sequences_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS category_sequences (
            code_category TEXT NOT NULL,
            code_maincategory TEXT NOT NULL,
            next_number INTEGER NOT NULL,
            PRIMARY KEY (code_category, code_maincategory)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_authors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            subtitle TEXT,
            year INTEGER,
            isbn TEXT,
            publisher TEXT,
            language TEXT,
            notes TEXT,
            pages INTEGER,
            cover_image TEXT,
            code_category TEXT NOT NULL,
            code_maincategory TEXT NOT NULL,
            number_in_category INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (code_category, code_maincategory)
                REFERENCES categories(code, code_maincategory),
            UNIQUE (code_maincategory, code_category, number_in_category)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_book_author_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_author (
            book_id TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            author_id TEXT NOT NULL REFERENCES authors(id),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (book_id, author_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_scanned_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scanned_books (
            id TEXT PRIMARY KEY,
            isbn TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            subtitle TEXT,
            authors_raw TEXT,
            published_year INTEGER,
            publisher TEXT,
            pages INTEGER,
            language TEXT,
            description TEXT,
            cover_url TEXT,
            cover_local TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            scanned_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_wishlist_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wishlist (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author_name TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
