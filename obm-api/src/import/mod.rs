//! Scan-import pipeline
//!
//! Takes an ISBN from scan to catalog in two stages: `scan` fetches
//! external metadata and stages a pending record; `promote` commits the
//! reviewed record as a catalog book in a single transaction, allocating
//! its tag number, resolving authors, and discarding the staging row.
//!
//! Staging state machine: pending -> reviewed -> imported (terminal, row
//! deleted), pending <-> skipped, or pending -> imported directly.

pub mod authors;

use obm_common::db::{book_tag, Book, ScanStatus, ScannedBook};
use obm_common::{Error, Result};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::db::{authors as authors_db, books, categories, scanned, sequences};
use crate::isbn::normalize_isbn;
use crate::providers::{download_cover, remove_cover_file, BookMetadata, CoverSource, MetadataProvider};

/// Placeholder ISBN prefix for manually staged entries
const MANUAL_ISBN_PREFIX: &str = "MANUAL-";

/// Author reference in a promotion request: an existing author id, or a
/// (first, last) pair to create. Exactly one form per entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AuthorSelection {
    Existing { existing_id: Uuid },
    New {
        #[serde(default)]
        first_name: String,
        last_name: String,
    },
}

/// Edited fields and selections committed by a promotion
#[derive(Debug, Clone, Deserialize)]
pub struct PromoteRequest {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pages: Option<i64>,
    pub code_category: String,
    pub code_maincategory: String,
    pub authors: Vec<AuthorSelection>,
}

/// Manually staged entry (no external fetch)
#[derive(Debug, Clone, Deserialize)]
pub struct ManualEntry {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub authors_raw: String,
    #[serde(default)]
    pub published_year: Option<i64>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub pages: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The scan-import workflow over its storage and provider capabilities
pub struct ImportPipeline {
    db: SqlitePool,
    metadata: Arc<dyn MetadataProvider>,
    covers: Arc<dyn CoverSource>,
    covers_dir: PathBuf,
    http_client: reqwest::Client,
}

impl ImportPipeline {
    pub fn new(
        db: SqlitePool,
        metadata: Arc<dyn MetadataProvider>,
        covers: Arc<dyn CoverSource>,
        covers_dir: PathBuf,
    ) -> Self {
        Self {
            db,
            metadata,
            covers,
            covers_dir,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Scan an ISBN: normalize, reject duplicates, fetch metadata, stage
    pub async fn scan(&self, ctx: &RequestContext, raw_isbn: &str) -> Result<ScannedBook> {
        let isbn = normalize_isbn(raw_isbn)?;

        if scanned::find_by_isbn(&self.db, &isbn).await?.is_some() {
            return Err(Error::already_scanned(&isbn));
        }
        if let Some(existing) = books::find_by_isbn(&self.db, &isbn).await? {
            return Err(Error::already_in_collection(&isbn, existing));
        }

        let metadata = self
            .metadata
            .lookup(&isbn)
            .await
            .ok_or_else(|| Error::NotFound(format!("No metadata found for ISBN {}", isbn)))?;

        let (cover_url, cover_local) = self.fetch_cover(&isbn, &metadata).await;

        let record = ScannedBook {
            id: Uuid::new_v4(),
            isbn: isbn.clone(),
            title: metadata.title,
            subtitle: metadata.subtitle,
            authors_raw: if metadata.authors.is_empty() {
                None
            } else {
                Some(metadata.authors.join(", "))
            },
            published_year: metadata.published_year,
            publisher: metadata.publisher,
            pages: metadata.pages,
            language: metadata.language,
            description: metadata.description,
            cover_url,
            cover_local,
            status: ScanStatus::Pending,
            scanned_at: chrono::Utc::now(),
        };
        scanned::insert_scanned(&self.db, &record).await?;

        info!(
            isbn = %isbn,
            title = %record.title,
            user = %ctx.principal.username,
            "ISBN scanned and staged"
        );
        Ok(record)
    }

    /// Stage an entry without an external fetch
    ///
    /// A placeholder ISBN keeps the staging uniqueness invariant; it never
    /// reaches the catalog.
    pub async fn add_manual(&self, ctx: &RequestContext, entry: ManualEntry) -> Result<ScannedBook> {
        if entry.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        if entry.authors_raw.trim().is_empty() {
            return Err(Error::Validation("At least one author is required".to_string()));
        }

        let record = ScannedBook {
            id: Uuid::new_v4(),
            isbn: format!("{}{}", MANUAL_ISBN_PREFIX, Uuid::new_v4()),
            title: entry.title.trim().to_string(),
            subtitle: entry.subtitle,
            authors_raw: Some(entry.authors_raw.trim().to_string()),
            published_year: entry.published_year,
            publisher: entry.publisher,
            pages: entry.pages,
            language: entry.language,
            description: entry.description,
            cover_url: None,
            cover_local: None,
            status: ScanStatus::Pending,
            scanned_at: chrono::Utc::now(),
        };
        scanned::insert_scanned(&self.db, &record).await?;

        info!(title = %record.title, user = %ctx.principal.username, "Manual entry staged");
        Ok(record)
    }

    /// Best-effort cover resolution: dedicated cover catalog first, then
    /// the metadata provider's own image, then none
    async fn fetch_cover(
        &self,
        isbn: &str,
        metadata: &BookMetadata,
    ) -> (Option<String>, Option<String>) {
        let cover_url = match self.covers.cover_url(isbn).await {
            Some(url) => Some(url),
            None => metadata.cover_url.clone(),
        };

        let cover_local = match &cover_url {
            Some(url) => download_cover(&self.http_client, url, &self.covers_dir, isbn)
                .await
                .map(|path| path.display().to_string()),
            None => None,
        };
        if cover_url.is_some() && cover_local.is_none() {
            warn!(isbn = %isbn, "Cover found but download failed; continuing without");
        }

        (cover_url, cover_local)
    }

    pub async fn skip(&self, id: Uuid) -> Result<()> {
        scanned::set_status(&self.db, id, ScanStatus::Skipped).await
    }

    pub async fn unskip(&self, id: Uuid) -> Result<()> {
        scanned::set_status(&self.db, id, ScanStatus::Pending).await
    }

    pub async fn review(&self, id: Uuid) -> Result<()> {
        scanned::set_status(&self.db, id, ScanStatus::Reviewed).await
    }

    /// Delete a staging row and its local cover file (best-effort)
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let record = scanned::delete_scanned(&self.db, id).await?;
        if let Some(cover) = &record.cover_local {
            remove_cover_file(cover);
        }
        Ok(())
    }

    /// Preview the tag the next book in a category would receive
    pub async fn preview_tag(&self, code_category: &str, code_maincategory: &str) -> Result<(String, i64)> {
        let category =
            categories::require_category(&self.db, code_category, code_maincategory).await?;
        let next = sequences::peek_next(&self.db, &category.code, &category.code_maincategory).await?;
        Ok((
            book_tag(&category.code_maincategory, &category.code, next),
            next,
        ))
    }

    /// Promote a staged record into the catalog
    ///
    /// Validation happens before any write; everything else (sequence
    /// allocation, book row, author creation, links, staging deletion) is
    /// one transaction that either fully commits or leaves the staging
    /// record untouched.
    pub async fn promote(
        &self,
        ctx: &RequestContext,
        scanned_id: Uuid,
        request: PromoteRequest,
    ) -> Result<Book> {
        if request.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".to_string()));
        }
        if request.authors.is_empty() {
            return Err(Error::Validation("At least one author is required".to_string()));
        }
        for selection in &request.authors {
            match selection {
                AuthorSelection::Existing { existing_id } => {
                    if authors_db::get_author(&self.db, *existing_id).await?.is_none() {
                        return Err(Error::Validation(format!(
                            "Unknown author {}",
                            existing_id
                        )));
                    }
                }
                AuthorSelection::New { last_name, .. } => {
                    if last_name.trim().is_empty() {
                        return Err(Error::Validation(
                            "Author last name is required".to_string(),
                        ));
                    }
                }
            }
        }
        categories::require_category(&self.db, &request.code_category, &request.code_maincategory)
            .await?;

        let staged = scanned::get_scanned(&self.db, scanned_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Scanned book {}", scanned_id)))?;

        let book_id = Uuid::new_v4();
        let mut tx = self.db.begin().await?;
        let outcome = promote_in_tx(&mut tx, book_id, &staged, &request).await;
        let number = match outcome {
            Ok(number) => number,
            Err(e) => {
                let _ = tx.rollback().await;
                return Err(transaction_failure(e));
            }
        };
        tx.commit()
            .await
            .map_err(|e| Error::Transaction(format!("Import commit failed: {e}")))?;

        if let Some(cover) = &staged.cover_local {
            // The catalog row references the same file now; nothing to clean
            tracing::debug!(cover = %cover, "Cover carried into catalog");
        }

        let book = books::get_book(&self.db, book_id)
            .await?
            .ok_or_else(|| Error::Transaction("Book vanished after import".to_string()))?;
        info!(
            book_id = %book.id,
            tag = %book.tag(),
            isbn = ?book.isbn,
            user = %ctx.principal.username,
            number,
            "Scanned book promoted into catalog"
        );
        Ok(book)
    }
}

/// The transactional body of a promotion
///
/// Runs entirely on one connection; any error aborts the whole batch.
async fn promote_in_tx(
    conn: &mut SqliteConnection,
    book_id: Uuid,
    staged: &ScannedBook,
    request: &PromoteRequest,
) -> Result<i64> {
    let number =
        sequences::allocate_next(conn, &request.code_category, &request.code_maincategory).await?;

    let isbn = request
        .isbn
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            if staged.isbn.starts_with(MANUAL_ISBN_PREFIX) {
                None
            } else {
                Some(staged.isbn.clone())
            }
        });

    let input = books::BookInput {
        title: request.title.clone(),
        subtitle: request.subtitle.clone(),
        year: request.year,
        isbn,
        publisher: request.publisher.clone(),
        language: request.language.clone(),
        notes: request.notes.clone(),
        pages: request.pages.or(staged.pages),
        cover_image: staged.cover_local.clone().or_else(|| staged.cover_url.clone()),
        code_category: request.code_category.clone(),
        code_maincategory: request.code_maincategory.clone(),
    };
    books::insert_book(conn, book_id, &input, number).await?;

    let mut author_ids = Vec::with_capacity(request.authors.len());
    for selection in &request.authors {
        let author_id = match selection {
            AuthorSelection::Existing { existing_id } => *existing_id,
            AuthorSelection::New {
                first_name,
                last_name,
            } => authors_db::insert_author(conn, first_name, last_name).await?.id,
        };
        author_ids.push(author_id);
    }
    for author_id in &author_ids {
        books::link_author(conn, book_id, *author_id).await?;
    }

    scanned::delete_scanned_in_tx(conn, staged.id).await?;

    Ok(number)
}

/// Storage failures inside the promote transaction surface as Transaction
/// errors; domain errors (validation raced, unknown author) keep their kind
fn transaction_failure(err: Error) -> Error {
    match err {
        Error::Storage(e) => Error::Transaction(format!("Import failed and was rolled back: {e}")),
        other => other,
    }
}
