//! API error type and response mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use obm_common::DuplicateKind;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid session token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Duplicate resource (409)
    #[error("Conflict ({}): {message}", .kind.as_code())]
    Duplicate {
        kind: DuplicateKind,
        message: String,
        existing: Option<obm_common::ExistingBook>,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<obm_common::Error> for ApiError {
    fn from(err: obm_common::Error) -> Self {
        use obm_common::Error;
        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::Duplicate {
                kind,
                message,
                existing,
            } => ApiError::Duplicate {
                kind,
                message,
                existing,
            },
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::Transaction(msg) => ApiError::Internal(msg),
            Error::Storage(err) => ApiError::Internal(format!("Storage error: {err}")),
            Error::Config(msg) => ApiError::Internal(format!("Configuration error: {msg}")),
            Error::Io(err) => ApiError::Internal(format!("IO error: {err}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, existing) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Duplicate {
                kind,
                message,
                existing,
            } => (StatusCode::CONFLICT, kind.as_code(), message, existing),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                err.to_string(),
                None,
            ),
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(book) = existing {
            error["book"] = json!({ "id": book.id, "title": book.title });
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
