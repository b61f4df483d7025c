//! Wishlist persistence
//!
//! Free-text entries, deliberately unrelated to the catalog's author and
//! category entities.

use chrono::{DateTime, Utc};
use obm_common::db::WishlistItem;
use obm_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::query::Page;

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|t| t.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<WishlistItem> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    Ok(WishlistItem {
        id: Uuid::parse_str(&id).map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?,
        title: row.get("title"),
        author_name: row.get("author_name"),
        notes: row.get("notes"),
        created_at: parse_timestamp(&created_at),
    })
}

pub async fn create_item(
    pool: &SqlitePool,
    title: &str,
    author_name: Option<&str>,
    notes: Option<&str>,
) -> Result<WishlistItem> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO wishlist (id, title, author_name, notes) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(title)
        .bind(author_name.map(str::trim).filter(|s| !s.is_empty()))
        .bind(notes.map(str::trim).filter(|s| !s.is_empty()))
        .execute(pool)
        .await?;

    get_item(pool, id)
        .await?
        .ok_or_else(|| Error::Transaction("Wishlist item vanished after insert".to_string()))
}

pub async fn get_item(pool: &SqlitePool, id: Uuid) -> Result<Option<WishlistItem>> {
    let row = sqlx::query("SELECT id, title, author_name, notes, created_at FROM wishlist WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_item).transpose()
}

pub async fn list_items(pool: &SqlitePool, page: Page) -> Result<(Vec<WishlistItem>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wishlist")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT id, title, author_name, notes, created_at
        FROM wishlist
        ORDER BY title COLLATE NOCASE
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let items = rows.iter().map(row_to_item).collect::<Result<Vec<_>>>()?;
    Ok((items, total))
}

pub async fn update_item(
    pool: &SqlitePool,
    id: Uuid,
    title: &str,
    author_name: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }

    let result =
        sqlx::query("UPDATE wishlist SET title = ?, author_name = ?, notes = ? WHERE id = ?")
            .bind(title)
            .bind(author_name.map(str::trim).filter(|s| !s.is_empty()))
            .bind(notes.map(str::trim).filter(|s| !s.is_empty()))
            .bind(id.to_string())
            .execute(pool)
            .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Wishlist item {}", id)));
    }
    Ok(())
}

pub async fn delete_item(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM wishlist WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Wishlist item {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        obm_common::db::create_wishlist_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let pool = test_pool().await;
        let item = create_item(&pool, "Sea of Tranquility", Some("Emily St. John Mandel"), None)
            .await
            .unwrap();

        update_item(&pool, item.id, "Sea of Tranquility", None, Some("paperback"))
            .await
            .unwrap();
        let updated = get_item(&pool, item.id).await.unwrap().unwrap();
        assert_eq!(updated.author_name, None);
        assert_eq!(updated.notes.as_deref(), Some("paperback"));

        delete_item(&pool, item.id).await.unwrap();
        assert!(matches!(
            delete_item(&pool, item.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn blank_optional_fields_stored_as_null() {
        let pool = test_pool().await;
        let item = create_item(&pool, "Title", Some("   "), Some(""))
            .await
            .unwrap();
        assert_eq!(item.author_name, None);
        assert_eq!(item.notes, None);
    }
}
