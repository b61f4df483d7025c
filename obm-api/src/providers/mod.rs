//! External metadata and cover-image capabilities
//!
//! The import pipeline depends on these traits abstractly; tests substitute
//! fakes. Both providers collapse network failure and "no result" into a
//! single unavailable outcome (None); an unreachable provider must never
//! crash a scan.

pub mod google_books;
pub mod open_library;

pub use google_books::GoogleBooksClient;
pub use open_library::OpenLibraryCovers;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Book metadata as delivered by an external provider
#[derive(Debug, Clone, Default)]
pub struct BookMetadata {
    pub title: String,
    pub subtitle: Option<String>,
    /// Free-text full names, one entry per author
    pub authors: Vec<String>,
    pub published_year: Option<i64>,
    pub publisher: Option<String>,
    pub pages: Option<i64>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

/// Metadata lookup by normalized ISBN
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Look up a normalized ISBN
    ///
    /// None covers both "not found" and provider failure.
    async fn lookup(&self, isbn: &str) -> Option<BookMetadata>;
}

/// Cover image lookup by normalized ISBN
#[async_trait]
pub trait CoverSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &'static str;

    /// Probe for a cover, returning a fetchable URL if one exists
    ///
    /// Existence is probed cheaply; the actual download happens separately.
    async fn cover_url(&self, isbn: &str) -> Option<String>;
}

/// Download a cover image to `<covers_dir>/<isbn>.jpg`
///
/// Best-effort: any failure logs a warning and returns None, leaving the
/// staged record without a local cover.
pub async fn download_cover(
    client: &reqwest::Client,
    url: &str,
    covers_dir: &Path,
    isbn: &str,
) -> Option<PathBuf> {
    if let Err(e) = tokio::fs::create_dir_all(covers_dir).await {
        warn!(error = %e, "Could not create covers directory");
        return None;
    }

    let response = match client.get(url).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            debug!(url = %url, status = %response.status(), "Cover download refused");
            return None;
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Cover download failed");
            return None;
        }
    };

    let bytes = match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => bytes,
        Ok(_) => {
            debug!(url = %url, "Cover download returned an empty body");
            return None;
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Cover download failed mid-body");
            return None;
        }
    };

    let path = covers_dir.join(format!("{isbn}.jpg"));
    match tokio::fs::write(&path, &bytes).await {
        Ok(()) => {
            debug!(path = %path.display(), bytes = bytes.len(), "Cover stored");
            Some(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not write cover file");
            None
        }
    }
}

/// Remove a locally stored cover file; missing files are not an error
pub fn remove_cover_file(path: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path, "Cover file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path, error = %e, "Could not remove cover file"),
    }
}
