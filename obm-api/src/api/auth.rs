//! Login and logout handlers

use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use obm_common::db::Principal;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub principal: Principal,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (token, principal) =
        crate::db::sessions::login(&state.db, &request.username, &request.password).await?;
    Ok(Json(LoginResponse { token, principal }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Json<serde_json::Value>> {
    crate::db::sessions::logout(&state.db, &ctx.token).await?;
    tracing::info!(user = %ctx.principal.username, "Session closed");
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}
