//! Book persistence
//!
//! Creation and re-categorization allocate the book's number_in_category
//! from the category sequence inside the same transaction as the row
//! write, so a failed insert never burns a number. Author links are owned
//! by the book and relinked wholesale on update.

use chrono::{DateTime, Utc};
use obm_common::db::{Author, Book};
use obm_common::{Error, ExistingBook, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::{authors, categories, sequences};
use crate::query::{BookSort, Page, SortOrder};

/// Editable book fields shared by create and update
#[derive(Debug, Clone)]
pub struct BookInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub year: Option<i64>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub pages: Option<i64>,
    pub cover_image: Option<String>,
    pub code_category: String,
    pub code_maincategory: String,
}

impl BookInput {
    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        Ok(())
    }
}

/// List filtering and paging parameters
#[derive(Debug, Clone, Default)]
pub struct BookListQuery {
    /// Matches against title (substring) or exact ISBN
    pub search: Option<String>,
    /// Restrict to one (subcategory, main category) pair
    pub category: Option<(String, String)>,
    pub sort: BookSort,
    pub order: SortOrder,
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            // CURRENT_TIMESTAMP default produces "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|t| t.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_book(row: &sqlx::sqlite::SqliteRow) -> Result<Book> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Ok(Book {
        id: Uuid::parse_str(&id).map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?,
        title: row.get("title"),
        subtitle: row.get("subtitle"),
        year: row.get("year"),
        isbn: row.get("isbn"),
        publisher: row.get("publisher"),
        language: row.get("language"),
        notes: row.get("notes"),
        pages: row.get("pages"),
        cover_image: row.get("cover_image"),
        code_category: row.get("code_category"),
        code_maincategory: row.get("code_maincategory"),
        number_in_category: row.get("number_in_category"),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

const BOOK_COLUMNS: &str = "id, title, subtitle, year, isbn, publisher, language, notes, pages, \
                            cover_image, code_category, code_maincategory, number_in_category, \
                            created_at, updated_at";

/// Insert a book row on the caller's connection (joins any open transaction)
pub async fn insert_book(
    conn: &mut SqliteConnection,
    id: Uuid,
    input: &BookInput,
    number_in_category: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO books (
            id, title, subtitle, year, isbn, publisher, language, notes, pages,
            cover_image, code_category, code_maincategory, number_in_category
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(input.title.trim())
    .bind(&input.subtitle)
    .bind(input.year)
    .bind(&input.isbn)
    .bind(&input.publisher)
    .bind(&input.language)
    .bind(&input.notes)
    .bind(input.pages)
    .bind(&input.cover_image)
    .bind(&input.code_category)
    .bind(&input.code_maincategory)
    .bind(number_in_category)
    .execute(conn)
    .await?;
    Ok(())
}

/// Link an author to a book on the caller's connection
pub async fn link_author(
    conn: &mut SqliteConnection,
    book_id: Uuid,
    author_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO book_author (book_id, author_id)
        VALUES (?, ?)
        ON CONFLICT(book_id, author_id) DO NOTHING
        "#,
    )
    .bind(book_id.to_string())
    .bind(author_id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

/// Create a catalog book, allocating its sequence number
///
/// The whole write (allocation, row, author links) is one transaction.
pub async fn create_book(pool: &SqlitePool, input: &BookInput, author_ids: &[Uuid]) -> Result<Book> {
    input.validate()?;
    if author_ids.is_empty() {
        return Err(Error::Validation("At least one author is required".to_string()));
    }
    categories::require_category(pool, &input.code_category, &input.code_maincategory).await?;
    for author_id in author_ids {
        if authors::get_author(pool, *author_id).await?.is_none() {
            return Err(Error::Validation(format!("Unknown author {}", author_id)));
        }
    }

    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;
    let number =
        sequences::allocate_next(&mut tx, &input.code_category, &input.code_maincategory).await?;
    insert_book(&mut tx, id, input, number).await?;
    for author_id in author_ids {
        link_author(&mut tx, id, *author_id).await?;
    }
    tx.commit().await?;

    tracing::info!(book_id = %id, number, category = %input.code_category, "Book created");
    get_book(pool, id)
        .await?
        .ok_or_else(|| Error::Transaction("Book vanished after insert".to_string()))
}

/// Update a book
///
/// If the category pair changed, a fresh number is allocated from the new
/// pair's sequence; the old number is abandoned, never reclaimed. Author
/// links are replaced with the given set.
pub async fn update_book(
    pool: &SqlitePool,
    id: Uuid,
    input: &BookInput,
    author_ids: &[Uuid],
) -> Result<Book> {
    input.validate()?;
    if author_ids.is_empty() {
        return Err(Error::Validation("At least one author is required".to_string()));
    }
    categories::require_category(pool, &input.code_category, &input.code_maincategory).await?;
    for author_id in author_ids {
        if authors::get_author(pool, *author_id).await?.is_none() {
            return Err(Error::Validation(format!("Unknown author {}", author_id)));
        }
    }

    let current = get_book(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Book {}", id)))?;

    let mut tx = pool.begin().await?;

    let recategorized = current.code_category != input.code_category
        || current.code_maincategory != input.code_maincategory;
    let number = if recategorized {
        sequences::allocate_next(&mut tx, &input.code_category, &input.code_maincategory).await?
    } else {
        current.number_in_category
    };

    sqlx::query(
        r#"
        UPDATE books SET
            title = ?, subtitle = ?, year = ?, isbn = ?, publisher = ?, language = ?,
            notes = ?, pages = ?, cover_image = ?, code_category = ?, code_maincategory = ?,
            number_in_category = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(input.title.trim())
    .bind(&input.subtitle)
    .bind(input.year)
    .bind(&input.isbn)
    .bind(&input.publisher)
    .bind(&input.language)
    .bind(&input.notes)
    .bind(input.pages)
    .bind(&input.cover_image)
    .bind(&input.code_category)
    .bind(&input.code_maincategory)
    .bind(number)
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM book_author WHERE book_id = ?")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    for author_id in author_ids {
        link_author(&mut tx, id, *author_id).await?;
    }

    tx.commit().await?;

    if recategorized {
        tracing::info!(
            book_id = %id,
            from = %format!("{}/{}", current.code_maincategory, current.code_category),
            to = %format!("{}/{}", input.code_maincategory, input.code_category),
            number,
            "Book re-categorized, new number allocated"
        );
    }

    get_book(pool, id)
        .await?
        .ok_or_else(|| Error::Transaction("Book vanished after update".to_string()))
}

pub async fn get_book(pool: &SqlitePool, id: Uuid) -> Result<Option<Book>> {
    let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_book).transpose()
}

/// Authors linked to a book, ordered by name
pub async fn get_book_authors(pool: &SqlitePool, book_id: Uuid) -> Result<Vec<Author>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.first_name, a.last_name
        FROM book_author ba
        JOIN authors a ON a.id = ba.author_id
        WHERE ba.book_id = ?
        ORDER BY a.last_name COLLATE NOCASE, a.first_name COLLATE NOCASE
        "#,
    )
    .bind(book_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id");
        result.push(Author {
            id: Uuid::parse_str(&id)
                .map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?,
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
        });
    }
    Ok(result)
}

/// Books linked to an author, ordered by title
pub async fn list_books_by_author(pool: &SqlitePool, author_id: Uuid) -> Result<Vec<Book>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {BOOK_COLUMNS} FROM books
        WHERE id IN (SELECT book_id FROM book_author WHERE author_id = ?)
        ORDER BY title COLLATE NOCASE
        "#
    ))
    .bind(author_id.to_string())
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_book).collect()
}

/// Minimal identity lookup by exact ISBN, for duplicate checks
pub async fn find_by_isbn(pool: &SqlitePool, isbn: &str) -> Result<Option<ExistingBook>> {
    let row = sqlx::query("SELECT id, title FROM books WHERE isbn = ?")
        .bind(isbn)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => {
            let id: String = row.get("id");
            Ok(Some(ExistingBook {
                id: Uuid::parse_str(&id)
                    .map_err(|e| Error::Storage(sqlx::Error::Decode(Box::new(e))))?,
                title: row.get("title"),
            }))
        }
        None => Ok(None),
    }
}

/// Page through the catalog with filters and an allow-listed sort
pub async fn list_books(
    pool: &SqlitePool,
    query: &BookListQuery,
    page: Page,
) -> Result<(Vec<Book>, i64)> {
    let mut where_sql = String::from("WHERE 1=1");
    if query.search.is_some() {
        where_sql.push_str(" AND (title LIKE ? OR isbn = ?)");
    }
    if query.category.is_some() {
        where_sql.push_str(" AND code_category = ? AND code_maincategory = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM books {where_sql}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(search) = &query.search {
        count_query = count_query
            .bind(format!("%{search}%"))
            .bind(search.clone());
    }
    if let Some((code, main)) = &query.category {
        count_query = count_query.bind(code.clone()).bind(main.clone());
    }
    let total = count_query.fetch_one(pool).await?;

    let list_sql = format!(
        "SELECT {BOOK_COLUMNS} FROM books {where_sql} ORDER BY {} {} LIMIT ? OFFSET ?",
        query.sort.order_by(),
        query.order.as_sql()
    );
    let mut list_query = sqlx::query(&list_sql);
    if let Some(search) = &query.search {
        list_query = list_query.bind(format!("%{search}%")).bind(search.clone());
    }
    if let Some((code, main)) = &query.category {
        list_query = list_query.bind(code.clone()).bind(main.clone());
    }
    let rows = list_query
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let books = rows.iter().map(row_to_book).collect::<Result<Vec<_>>>()?;
    Ok((books, total))
}

/// Delete a book; returns its cover reference for best-effort file cleanup
///
/// Author links cascade with the row. The sequence number is not reclaimed.
pub async fn delete_book(pool: &SqlitePool, id: Uuid) -> Result<Option<String>> {
    let book = get_book(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Book {}", id)))?;

    sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    tracing::info!(book_id = %id, tag = %book.tag(), "Book deleted");
    Ok(book.cover_image)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        obm_common::db::create_all_tables(&pool).await.unwrap();
        categories::create_maincategory(&pool, "WR", "Western Literature")
            .await
            .unwrap();
        categories::create_category(&pool, "PH", "WR", "Philosophy")
            .await
            .unwrap();
        categories::create_category(&pool, "KL", "WR", "Classics")
            .await
            .unwrap();
        pool
    }

    fn input(title: &str, category: &str) -> BookInput {
        BookInput {
            title: title.to_string(),
            subtitle: None,
            year: Some(1990),
            isbn: None,
            publisher: None,
            language: None,
            notes: None,
            pages: None,
            cover_image: None,
            code_category: category.to_string(),
            code_maincategory: "WR".to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_numbers_and_tags() {
        let pool = test_pool().await;
        let author = authors::create_author(&pool, "Jane", "Doe").await.unwrap();

        let first = create_book(&pool, &input("First", "PH"), &[author.id])
            .await
            .unwrap();
        let second = create_book(&pool, &input("Second", "PH"), &[author.id])
            .await
            .unwrap();

        assert_eq!(first.tag(), "WR PH 0001");
        assert_eq!(second.tag(), "WR PH 0002");
        assert_eq!(get_book_authors(&pool, first.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_requires_author_and_valid_category() {
        let pool = test_pool().await;
        let author = authors::create_author(&pool, "Jane", "Doe").await.unwrap();

        let err = create_book(&pool, &input("No authors", "PH"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = create_book(&pool, &input("Bad category", "ZZ"), &[author.id])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn recategorize_allocates_fresh_number_and_abandons_old() {
        let pool = test_pool().await;
        let author = authors::create_author(&pool, "Jane", "Doe").await.unwrap();

        let book = create_book(&pool, &input("Wanderer", "PH"), &[author.id])
            .await
            .unwrap();
        assert_eq!(book.tag(), "WR PH 0001");

        let moved = update_book(&pool, book.id, &input("Wanderer", "KL"), &[author.id])
            .await
            .unwrap();
        assert_eq!(moved.tag(), "WR KL 0001");

        // The old PH number is not reclaimed by the next PH book
        let next = create_book(&pool, &input("Newcomer", "PH"), &[author.id])
            .await
            .unwrap();
        assert_eq!(next.tag(), "WR PH 0002");
    }

    #[tokio::test]
    async fn update_without_category_change_keeps_number() {
        let pool = test_pool().await;
        let author = authors::create_author(&pool, "Jane", "Doe").await.unwrap();

        let book = create_book(&pool, &input("Original", "PH"), &[author.id])
            .await
            .unwrap();
        let edited = update_book(&pool, book.id, &input("Renamed", "PH"), &[author.id])
            .await
            .unwrap();

        assert_eq!(edited.title, "Renamed");
        assert_eq!(edited.number_in_category, book.number_in_category);
    }

    #[tokio::test]
    async fn delete_cascades_links_and_keeps_counter() {
        let pool = test_pool().await;
        let author = authors::create_author(&pool, "Jane", "Doe").await.unwrap();
        let book = create_book(&pool, &input("Short-lived", "PH"), &[author.id])
            .await
            .unwrap();

        delete_book(&pool, book.id).await.unwrap();
        assert!(get_book(&pool, book.id).await.unwrap().is_none());

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_author")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 0);

        // Counter did not rewind
        assert_eq!(
            sequences::peek_next(&pool, "PH", "WR").await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let pool = test_pool().await;
        let author = authors::create_author(&pool, "Jane", "Doe").await.unwrap();
        for title in ["Beta", "Alpha", "Gamma"] {
            create_book(&pool, &input(title, "PH"), &[author.id])
                .await
                .unwrap();
        }

        let (books, total) = list_books(
            &pool,
            &BookListQuery {
                sort: BookSort::Title,
                ..Default::default()
            },
            Page::new(1, 50),
        )
        .await
        .unwrap();
        assert_eq!(total, 3);
        assert_eq!(books[0].title, "Alpha");

        let (books, total) = list_books(
            &pool,
            &BookListQuery {
                search: Some("Gam".to_string()),
                ..Default::default()
            },
            Page::new(1, 50),
        )
        .await
        .unwrap();
        assert_eq!(total, 1);
        assert_eq!(books[0].title, "Gamma");
    }
}
