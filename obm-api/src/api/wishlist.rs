//! Wishlist handlers

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use obm_common::db::WishlistItem;
use serde::Deserialize;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::db::wishlist;
use crate::error::{ApiError, ApiResult};
use crate::query::{Page, Paginated};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WishlistListParams {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WishlistBody {
    pub title: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// GET /wishlist
pub async fn list_items(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(params): Query<WishlistListParams>,
) -> ApiResult<Json<Paginated<WishlistItem>>> {
    let page = Page::new(params.page.unwrap_or(1), state.config.pagination.wishlist);
    let (items, total) = wishlist::list_items(&state.db, page).await?;
    Ok(Json(Paginated::new(items, total, page)))
}

/// POST /wishlist
pub async fn create_item(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Json(body): Json<WishlistBody>,
) -> ApiResult<Json<WishlistItem>> {
    let item = wishlist::create_item(
        &state.db,
        &body.title,
        body.author_name.as_deref(),
        body.notes.as_deref(),
    )
    .await?;
    Ok(Json(item))
}

/// PUT /wishlist/{id}
pub async fn update_item(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<WishlistBody>,
) -> ApiResult<Json<WishlistItem>> {
    wishlist::update_item(
        &state.db,
        id,
        &body.title,
        body.author_name.as_deref(),
        body.notes.as_deref(),
    )
    .await?;
    let item = wishlist::get_item(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Wishlist item {id}")))?;
    Ok(Json(item))
}

/// DELETE /wishlist/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    wishlist::delete_item(&state.db, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(list_items).post(create_item))
        .route("/wishlist/:id", axum::routing::put(update_item).delete(delete_item))
}
