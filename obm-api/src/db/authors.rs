//! Author persistence
//!
//! Author identity for dedup purposes is case-insensitive (first, last)
//! name equality, checked by application logic at insert time. This is a
//! best-effort heuristic, not a store-enforced constraint: two concurrent
//! writers can still race a duplicate past the check.

use obm_common::db::Author;
use obm_common::{Error, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Author with the number of catalog books linked to them
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthorListing {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub book_count: i64,
}

fn row_to_author(row: &sqlx::sqlite::SqliteRow) -> Result<Author> {
    let id: String = row.get("id");
    Ok(Author {
        id: Uuid::parse_str(&id).map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?,
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
    })
}

/// Case-insensitive lookup by exact (first, last) name
pub async fn find_by_name(
    pool: &SqlitePool,
    first_name: &str,
    last_name: &str,
) -> Result<Option<Author>> {
    let row = sqlx::query(
        r#"
        SELECT id, first_name, last_name FROM authors
        WHERE LOWER(first_name) = LOWER(?) AND LOWER(last_name) = LOWER(?)
        "#,
    )
    .bind(first_name.trim())
    .bind(last_name.trim())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(row_to_author).transpose()
}

/// Insert an author on the caller's connection (joins any open transaction)
pub async fn insert_author(
    conn: &mut SqliteConnection,
    first_name: &str,
    last_name: &str,
) -> Result<Author> {
    let last_name = last_name.trim();
    if last_name.is_empty() {
        return Err(Error::Validation("Author last name is required".to_string()));
    }
    let first_name = first_name.trim();

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO authors (id, first_name, last_name) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(first_name)
        .bind(last_name)
        .execute(conn)
        .await?;

    Ok(Author {
        id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
    })
}

/// Create an author with the application-level dedup check
pub async fn create_author(pool: &SqlitePool, first_name: &str, last_name: &str) -> Result<Author> {
    if let Some(existing) = find_by_name(pool, first_name, last_name).await? {
        return Err(Error::Validation(format!(
            "Author '{} {}' already exists",
            existing.first_name, existing.last_name
        )));
    }
    let mut conn = pool.acquire().await?;
    insert_author(&mut conn, first_name, last_name).await
}

pub async fn get_author(pool: &SqlitePool, id: Uuid) -> Result<Option<Author>> {
    let row = sqlx::query("SELECT id, first_name, last_name FROM authors WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_author).transpose()
}

pub async fn list_authors(
    pool: &SqlitePool,
    page: crate::query::Page,
) -> Result<(Vec<AuthorListing>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT a.id, a.first_name, a.last_name,
               (SELECT COUNT(*) FROM book_author ba WHERE ba.author_id = a.id) AS book_count
        FROM authors a
        ORDER BY a.last_name COLLATE NOCASE, a.first_name COLLATE NOCASE
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let mut listings = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id");
        listings.push(AuthorListing {
            id: Uuid::parse_str(&id)
                .map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            book_count: row.get("book_count"),
        });
    }
    Ok((listings, total))
}

pub async fn update_author(
    pool: &SqlitePool,
    id: Uuid,
    first_name: &str,
    last_name: &str,
) -> Result<()> {
    let last_name = last_name.trim();
    if last_name.is_empty() {
        return Err(Error::Validation("Author last name is required".to_string()));
    }

    let result = sqlx::query("UPDATE authors SET first_name = ?, last_name = ? WHERE id = ?")
        .bind(first_name.trim())
        .bind(last_name)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Author {}", id)));
    }
    Ok(())
}

/// Delete an author; rejected while catalog books still reference them
pub async fn delete_author(pool: &SqlitePool, id: Uuid) -> Result<()> {
    if get_author(pool, id).await?.is_none() {
        return Err(Error::NotFound(format!("Author {}", id)));
    }

    let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_author WHERE author_id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    if books > 0 {
        return Err(Error::Validation(format!(
            "Cannot delete author: {} book(s) reference them",
            books
        )));
    }

    sqlx::query("DELETE FROM authors WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(())
}
