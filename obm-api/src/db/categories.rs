//! Category taxonomy operations
//!
//! Two levels: main categories own subcategories, subcategories own books.
//! Codes are 2-letter, uppercased on input, and immutable once created;
//! only titles can be edited. Deletion is guarded: a subcategory with books
//! or a main category with subcategories cannot be removed.

use obm_common::db::{Category, MainCategory};
use obm_common::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Normalize and validate a 2-letter category code
pub fn normalize_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(Error::Validation(format!(
            "Category code must be exactly 2 letters, got '{}'",
            raw.trim()
        )))
    }
}

/// Subcategory with its main category title, for grouped listings
#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryListing {
    pub code: String,
    pub code_maincategory: String,
    pub title: String,
    pub maincategory_title: String,
    pub book_count: i64,
}

pub async fn list_maincategories(pool: &SqlitePool) -> Result<Vec<MainCategory>> {
    let rows = sqlx::query("SELECT code, title FROM maincategories ORDER BY code")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| MainCategory {
            code: row.get("code"),
            title: row.get("title"),
        })
        .collect())
}

pub async fn get_maincategory(pool: &SqlitePool, code: &str) -> Result<Option<MainCategory>> {
    let row = sqlx::query("SELECT code, title FROM maincategories WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| MainCategory {
        code: row.get("code"),
        title: row.get("title"),
    }))
}

pub async fn create_maincategory(pool: &SqlitePool, code: &str, title: &str) -> Result<MainCategory> {
    let code = normalize_code(code)?;
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    if get_maincategory(pool, &code).await?.is_some() {
        return Err(Error::Validation(format!(
            "Main category '{}' already exists",
            code
        )));
    }

    sqlx::query("INSERT INTO maincategories (code, title) VALUES (?, ?)")
        .bind(&code)
        .bind(title)
        .execute(pool)
        .await?;
    Ok(MainCategory {
        code,
        title: title.to_string(),
    })
}

/// Update a main category title. The code is immutable.
pub async fn update_maincategory(pool: &SqlitePool, code: &str, title: &str) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    let result = sqlx::query("UPDATE maincategories SET title = ? WHERE code = ?")
        .bind(title)
        .bind(code)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Main category '{}'", code)));
    }
    Ok(())
}

/// Delete a main category; rejected while it still owns subcategories
pub async fn delete_maincategory(pool: &SqlitePool, code: &str) -> Result<()> {
    if get_maincategory(pool, code).await?.is_none() {
        return Err(Error::NotFound(format!("Main category '{}'", code)));
    }

    let subcategories: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE code_maincategory = ?")
            .bind(code)
            .fetch_one(pool)
            .await?;
    if subcategories > 0 {
        return Err(Error::Validation(format!(
            "Cannot delete main category '{}': it has {} subcategorie(s)",
            code, subcategories
        )));
    }

    sqlx::query("DELETE FROM maincategories WHERE code = ?")
        .bind(code)
        .execute(pool)
        .await?;
    Ok(())
}

/// All subcategories joined with main category titles and book counts
pub async fn list_categories(pool: &SqlitePool) -> Result<Vec<CategoryListing>> {
    let rows = sqlx::query(
        r#"
        SELECT c.code, c.code_maincategory, c.title, m.title AS maincategory_title,
               (SELECT COUNT(*) FROM books b
                WHERE b.code_category = c.code AND b.code_maincategory = c.code_maincategory)
               AS book_count
        FROM categories c
        JOIN maincategories m ON m.code = c.code_maincategory
        ORDER BY m.code, c.code
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| CategoryListing {
            code: row.get("code"),
            code_maincategory: row.get("code_maincategory"),
            title: row.get("title"),
            maincategory_title: row.get("maincategory_title"),
            book_count: row.get("book_count"),
        })
        .collect())
}

pub async fn get_category(
    pool: &SqlitePool,
    code: &str,
    code_maincategory: &str,
) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT code, code_maincategory, title FROM categories WHERE code = ? AND code_maincategory = ?",
    )
    .bind(code)
    .bind(code_maincategory)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| Category {
        code: row.get("code"),
        code_maincategory: row.get("code_maincategory"),
        title: row.get("title"),
    }))
}

/// Resolve a category pair or fail with Validation
///
/// Used by the import pipeline and book create/edit: a category selection
/// must name a real (subcategory, main category) pair before any write.
pub async fn require_category(
    pool: &SqlitePool,
    code: &str,
    code_maincategory: &str,
) -> Result<Category> {
    get_category(pool, code, code_maincategory)
        .await?
        .ok_or_else(|| {
            Error::Validation(format!(
                "Invalid category selected: '{}/{}'",
                code_maincategory, code
            ))
        })
}

pub async fn create_category(
    pool: &SqlitePool,
    code: &str,
    code_maincategory: &str,
    title: &str,
) -> Result<Category> {
    let code = normalize_code(code)?;
    let code_maincategory = normalize_code(code_maincategory)?;
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }

    if get_maincategory(pool, &code_maincategory).await?.is_none() {
        return Err(Error::Validation(format!(
            "Main category '{}' does not exist",
            code_maincategory
        )));
    }
    if get_category(pool, &code, &code_maincategory).await?.is_some() {
        return Err(Error::Validation(format!(
            "Subcategory '{}' already exists under '{}'",
            code, code_maincategory
        )));
    }

    sqlx::query("INSERT INTO categories (code, code_maincategory, title) VALUES (?, ?, ?)")
        .bind(&code)
        .bind(&code_maincategory)
        .bind(title)
        .execute(pool)
        .await?;
    Ok(Category {
        code,
        code_maincategory,
        title: title.to_string(),
    })
}

/// Update a subcategory title. Codes are immutable.
pub async fn update_category(
    pool: &SqlitePool,
    code: &str,
    code_maincategory: &str,
    title: &str,
) -> Result<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Title is required".to_string()));
    }
    let result =
        sqlx::query("UPDATE categories SET title = ? WHERE code = ? AND code_maincategory = ?")
            .bind(title)
            .bind(code)
            .bind(code_maincategory)
            .execute(pool)
            .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Subcategory '{}/{}'",
            code_maincategory, code
        )));
    }
    Ok(())
}

/// Delete a subcategory; rejected while it still owns books
///
/// The sequence counter row is left in place: numbers are never reused,
/// even if the same code pair is later recreated.
pub async fn delete_category(pool: &SqlitePool, code: &str, code_maincategory: &str) -> Result<()> {
    if get_category(pool, code, code_maincategory).await?.is_none() {
        return Err(Error::NotFound(format!(
            "Subcategory '{}/{}'",
            code_maincategory, code
        )));
    }

    let books: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM books WHERE code_category = ? AND code_maincategory = ?",
    )
    .bind(code)
    .bind(code_maincategory)
    .fetch_one(pool)
    .await?;
    if books > 0 {
        return Err(Error::Validation(format!(
            "Cannot delete subcategory '{}/{}': it has {} book(s)",
            code_maincategory, code, books
        )));
    }

    sqlx::query("DELETE FROM categories WHERE code = ? AND code_maincategory = ?")
        .bind(code)
        .bind(code_maincategory)
        .execute(pool)
        .await?;
    Ok(())
}
