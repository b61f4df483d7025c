//! Common error types for OpenBookManager

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Common result type for OpenBookManager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which duplicate check a scan tripped over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    /// ISBN already present in the staging table
    AlreadyScanned,
    /// ISBN already present in the catalog
    AlreadyInCollection,
}

impl DuplicateKind {
    /// Stable machine-readable code for API responses
    pub fn as_code(&self) -> &'static str {
        match self {
            DuplicateKind::AlreadyScanned => "already_scanned",
            DuplicateKind::AlreadyInCollection => "already_in_collection",
        }
    }
}

impl std::fmt::Display for DuplicateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Identity of the catalog book a duplicate check collided with
#[derive(Debug, Clone, Serialize)]
pub struct ExistingBook {
    pub id: Uuid,
    pub title: String,
}

/// Common error types across OpenBookManager services
///
/// Validation is always reported before any write; Duplicate and NotFound
/// are recoverable and informational; Transaction means a multi-step write
/// was rolled back with no partial state surviving.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing user input, checked before any mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// ISBN collision during scan
    #[error("Duplicate ({kind}): {message}")]
    Duplicate {
        kind: DuplicateKind,
        message: String,
        /// Populated for already_in_collection so the caller can link to it
        existing: Option<ExistingBook>,
    },

    /// Requested resource not found (also covers external-metadata misses)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A multi-step write failed and was rolled back
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Storage connectivity or query failure (wraps sqlx::Error)
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an already_scanned duplicate
    pub fn already_scanned(isbn: &str) -> Self {
        Error::Duplicate {
            kind: DuplicateKind::AlreadyScanned,
            message: format!("ISBN {} was already scanned", isbn),
            existing: None,
        }
    }

    /// Shorthand for an already_in_collection duplicate
    pub fn already_in_collection(isbn: &str, existing: ExistingBook) -> Self {
        Error::Duplicate {
            kind: DuplicateKind::AlreadyInCollection,
            message: format!("ISBN {} is already in the collection", isbn),
            existing: Some(existing),
        }
    }
}
