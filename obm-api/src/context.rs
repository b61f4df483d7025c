//! Request-scoped context
//!
//! Every authenticated request carries an explicit context with the
//! resolved principal; core operations take it as a parameter instead of
//! reading ambient session state.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use obm_common::db::Principal;

use crate::error::ApiError;
use crate::AppState;

/// Context for one authenticated request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    /// Session token the request authenticated with
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

        let principal = crate::db::sessions::authenticate(&state.db, &token)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

        Ok(RequestContext { principal, token })
    }
}

/// Extract the bearer token from the Authorization header
fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
