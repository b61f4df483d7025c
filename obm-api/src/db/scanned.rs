//! Scanned-book staging persistence
//!
//! Rows live only between a successful external fetch and either deletion
//! or promotion into the catalog; promotion removes the row in the same
//! transaction that creates the book.

use chrono::{DateTime, Utc};
use obm_common::db::{ScanStatus, ScannedBook};
use obm_common::{Error, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::query::{Page, ScanSort, SortOrder};

/// Pending/skipped staging counts for the review UI
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScanStats {
    pub total: i64,
    /// pending + reviewed (both await import)
    pub pending: i64,
    pub skipped: i64,
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|t| t.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_scanned(row: &sqlx::sqlite::SqliteRow) -> Result<ScannedBook> {
    let id: String = row.get("id");
    let status: String = row.get("status");
    let scanned_at: String = row.get("scanned_at");
    Ok(ScannedBook {
        id: Uuid::parse_str(&id).map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?,
        isbn: row.get("isbn"),
        title: row.get("title"),
        subtitle: row.get("subtitle"),
        authors_raw: row.get("authors_raw"),
        published_year: row.get("published_year"),
        publisher: row.get("publisher"),
        pages: row.get("pages"),
        language: row.get("language"),
        description: row.get("description"),
        cover_url: row.get("cover_url"),
        cover_local: row.get("cover_local"),
        status: ScanStatus::parse(&status).ok_or_else(|| {
            Error::Storage(sqlx::Error::Decode(
                format!("Unknown scan status '{status}'").into(),
            ))
        })?,
        scanned_at: parse_timestamp(&scanned_at),
    })
}

const SCANNED_COLUMNS: &str = "id, isbn, title, subtitle, authors_raw, published_year, publisher, \
                               pages, language, description, cover_url, cover_local, status, \
                               scanned_at";

pub async fn insert_scanned(pool: &SqlitePool, book: &ScannedBook) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO scanned_books (
            id, isbn, title, subtitle, authors_raw, published_year, publisher,
            pages, language, description, cover_url, cover_local, status, scanned_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(book.id.to_string())
    .bind(&book.isbn)
    .bind(&book.title)
    .bind(&book.subtitle)
    .bind(&book.authors_raw)
    .bind(book.published_year)
    .bind(&book.publisher)
    .bind(book.pages)
    .bind(&book.language)
    .bind(&book.description)
    .bind(&book.cover_url)
    .bind(&book.cover_local)
    .bind(book.status.as_str())
    .bind(book.scanned_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_scanned(pool: &SqlitePool, id: Uuid) -> Result<Option<ScannedBook>> {
    let row = sqlx::query(&format!(
        "SELECT {SCANNED_COLUMNS} FROM scanned_books WHERE id = ?"
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(row_to_scanned).transpose()
}

pub async fn find_by_isbn(pool: &SqlitePool, isbn: &str) -> Result<Option<ScannedBook>> {
    let row = sqlx::query(&format!(
        "SELECT {SCANNED_COLUMNS} FROM scanned_books WHERE isbn = ?"
    ))
    .bind(isbn)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(row_to_scanned).transpose()
}

/// Page through the staging area, optionally filtered by status
pub async fn list_scanned(
    pool: &SqlitePool,
    status: Option<ScanStatus>,
    sort: ScanSort,
    order: SortOrder,
    page: Page,
) -> Result<(Vec<ScannedBook>, i64)> {
    let where_sql = match status {
        Some(_) => "WHERE status = ?",
        None => "WHERE 1=1",
    };

    let count_sql = format!("SELECT COUNT(*) FROM scanned_books {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(status) = status {
        count_query = count_query.bind(status.as_str());
    }
    let total = count_query.fetch_one(pool).await?;

    let list_sql = format!(
        "SELECT {SCANNED_COLUMNS} FROM scanned_books {where_sql} ORDER BY {} {} LIMIT ? OFFSET ?",
        sort.order_by(),
        order.as_sql()
    );
    let mut list_query = sqlx::query(&list_sql);
    if let Some(status) = status {
        list_query = list_query.bind(status.as_str());
    }
    let rows = list_query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let books = rows.iter().map(row_to_scanned).collect::<Result<Vec<_>>>()?;
    Ok((books, total))
}

pub async fn stats(pool: &SqlitePool) -> Result<ScanStats> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN status IN ('pending', 'reviewed') THEN 1 ELSE 0 END), 0)
                AS pending,
            COALESCE(SUM(CASE WHEN status = 'skipped' THEN 1 ELSE 0 END), 0) AS skipped
        FROM scanned_books
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(ScanStats {
        total: row.get("total"),
        pending: row.get("pending"),
        skipped: row.get("skipped"),
    })
}

/// Set the lifecycle status; repeated calls with the same target are no-ops
pub async fn set_status(pool: &SqlitePool, id: Uuid, status: ScanStatus) -> Result<()> {
    let result = sqlx::query("UPDATE scanned_books SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Scanned book {}", id)));
    }
    Ok(())
}

/// Remove a staging row, returning it for cover cleanup
pub async fn delete_scanned(pool: &SqlitePool, id: Uuid) -> Result<ScannedBook> {
    let book = get_scanned(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Scanned book {}", id)))?;
    sqlx::query("DELETE FROM scanned_books WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(book)
}

/// Remove a staging row on the caller's connection (promotion path)
pub async fn delete_scanned_in_tx(conn: &mut SqliteConnection, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM scanned_books WHERE id = ?")
        .bind(id.to_string())
        .execute(conn)
        .await?;
    Ok(())
}
