//! obm-api library interface
//!
//! Exposes the application state, router construction, and the catalog /
//! import modules for integration testing.

pub mod api;
pub mod context;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod isbn;
pub mod providers;
pub mod query;

pub use crate::context::RequestContext;
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use obm_common::config::Config;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::import::ImportPipeline;
use crate::providers::{CoverSource, GoogleBooksClient, MetadataProvider, OpenLibraryCovers};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved service configuration
    pub config: Arc<Config>,
    /// Scan-import workflow over the configured providers
    pub import: Arc<ImportPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create state with the default external providers
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let metadata = Arc::new(GoogleBooksClient::new(config.google_books_api_key.clone()));
        let covers = Arc::new(OpenLibraryCovers::new());
        Self::with_providers(db, config, metadata, covers)
    }

    /// Create state with explicit providers (used by tests to inject fakes)
    pub fn with_providers(
        db: SqlitePool,
        config: Config,
        metadata: Arc<dyn MetadataProvider>,
        covers: Arc<dyn CoverSource>,
    ) -> Self {
        let import = Arc::new(ImportPipeline::new(
            db.clone(),
            metadata,
            covers,
            config.covers_dir.clone(),
        ));
        Self {
            db,
            config: Arc::new(config),
            import,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::auth::auth_routes())
        .merge(api::books::book_routes())
        .merge(api::authors::author_routes())
        .merge(api::categories::category_routes())
        .merge(api::scan::scan_routes())
        .merge(api::wishlist::wishlist_routes())
        .merge(api::exports::export_routes())
        .merge(api::health::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
