//! Open Library cover source
//!
//! Covers are addressed directly by ISBN; `default=false` makes the server
//! answer 404 instead of a placeholder image, so existence can be probed
//! with a HEAD request before committing to a download.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::CoverSource;

/// Open Library covers base URL
const OPEN_LIBRARY_COVERS_URL: &str = "https://covers.openlibrary.org/b/isbn";

/// Probes and downloads share one short timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("OpenBookManager/", env!("CARGO_PKG_VERSION"));

/// Open Library cover lookup
pub struct OpenLibraryCovers {
    http_client: Client,
}

impl OpenLibraryCovers {
    pub fn new() -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for OpenLibraryCovers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoverSource for OpenLibraryCovers {
    fn name(&self) -> &'static str {
        "open-library"
    }

    async fn cover_url(&self, isbn: &str) -> Option<String> {
        let url = format!("{OPEN_LIBRARY_COVERS_URL}/{isbn}-L.jpg?default=false");

        match self.http_client.head(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(isbn = %isbn, "Open Library has a cover");
                Some(url)
            }
            Ok(response) => {
                debug!(isbn = %isbn, status = %response.status(), "No Open Library cover");
                None
            }
            Err(e) => {
                warn!(isbn = %isbn, error = %e, "Open Library probe failed");
                None
            }
        }
    }
}
