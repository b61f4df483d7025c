//! Google Books metadata client
//!
//! Queries the Google Books volumes API by ISBN. An API key is optional;
//! unauthenticated requests are rate-limited harder by Google, so requests
//! are additionally spaced client-side.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::{BookMetadata, MetadataProvider};

/// Google Books volumes API base URL
const GOOGLE_BOOKS_API_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Default timeout for metadata requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side spacing between requests
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1000);

const USER_AGENT: &str = concat!("OpenBookManager/", env!("CARGO_PKG_VERSION"));

/// Google Books client
pub struct GoogleBooksClient {
    http_client: Client,
    api_key: Option<String>,
    /// Last request time, for client-side request spacing
    rate_limiter: Arc<Mutex<Option<Instant>>>,
}

impl GoogleBooksClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
            api_key,
            rate_limiter: Arc::new(Mutex::new(None)),
        }
    }

    async fn enforce_rate_limit(&self) {
        let mut last_request = self.rate_limiter.lock().await;
        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < RATE_LIMIT_INTERVAL {
                let sleep_duration = RATE_LIMIT_INTERVAL - elapsed;
                debug!(
                    sleep_ms = sleep_duration.as_millis(),
                    "Rate limiting: sleeping before Google Books request"
                );
                sleep(sleep_duration).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksClient {
    fn name(&self) -> &'static str {
        "google-books"
    }

    async fn lookup(&self, isbn: &str) -> Option<BookMetadata> {
        self.enforce_rate_limit().await;

        let mut request = self
            .http_client
            .get(GOOGLE_BOOKS_API_URL)
            .query(&[("q", format!("isbn:{isbn}"))]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(isbn = %isbn, error = %e, "Google Books request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(isbn = %isbn, status = %response.status(), "Google Books returned an error");
            return None;
        }

        let body: VolumesResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(isbn = %isbn, error = %e, "Google Books response parse failed");
                return None;
            }
        };

        let volume = body.items.into_iter().flatten().next()?;
        let info = volume.volume_info;
        let title = info.title?;

        debug!(isbn = %isbn, title = %title, "Google Books match");
        Some(BookMetadata {
            title,
            subtitle: info.subtitle,
            authors: info.authors,
            published_year: info.published_date.as_deref().and_then(published_year),
            publisher: info.publisher,
            pages: info.page_count,
            language: info.language,
            description: info.description,
            cover_url: info.image_links.and_then(|links| {
                links.thumbnail.or(links.small_thumbnail).map(force_https)
            }),
        })
    }
}

/// Extract the year from a "YYYY", "YYYY-MM" or "YYYY-MM-DD" date string
fn published_year(date: &str) -> Option<i64> {
    let year: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
    if year.len() == 4 {
        year.parse().ok()
    } else {
        None
    }
}

/// Google serves thumbnail links as http://
fn force_https(url: String) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url,
    }
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    items: Option<Vec<Volume>>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    published_date: Option<String>,
    publisher: Option<String>,
    page_count: Option<i64>,
    language: Option<String>,
    description: Option<String>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}
