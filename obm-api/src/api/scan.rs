//! Scan and import-review handlers
//!
//! The staging workflow: POST /scan stages an ISBN, GET /scan lists the
//! review queue, the /scan/{id}/* routes drive the lifecycle, and
//! /scan/{id}/promote commits a staged record into the catalog.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use obm_common::db::{ScanStatus, ScannedBook};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::books::BookView;
use crate::context::RequestContext;
use crate::db::scanned::{self, ScanStats};
use crate::error::{ApiError, ApiResult};
use crate::import::{authors::AuthorCandidate, ManualEntry, PromoteRequest};
use crate::query::{Page, Paginated, ScanSort, SortOrder};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub isbn: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanListParams {
    /// pending | reviewed | skipped | all (default pending)
    pub status: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ScanListResponse {
    #[serde(flatten)]
    pub page: Paginated<ScannedBook>,
    pub stats: ScanStats,
}

#[derive(Debug, Deserialize)]
pub struct ParseAuthorsRequest {
    pub authors_raw: String,
}

#[derive(Debug, Deserialize)]
pub struct PreviewTagParams {
    pub category: String,
    pub maincategory: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewTagResponse {
    pub tag: String,
    pub next_number: i64,
}

/// POST /scan: stage an ISBN
pub async fn scan_isbn(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<ScannedBook>> {
    let record = state.import.scan(&ctx, &request.isbn).await?;
    Ok(Json(record))
}

/// POST /scan/manual: stage an entry without an external fetch
pub async fn add_manual(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(entry): Json<ManualEntry>,
) -> ApiResult<Json<ScannedBook>> {
    let record = state.import.add_manual(&ctx, entry).await?;
    Ok(Json(record))
}

/// GET /scan: review queue with stats
pub async fn list_scans(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(params): Query<ScanListParams>,
) -> ApiResult<Json<ScanListResponse>> {
    let status = match params.status.as_deref() {
        None => Some(ScanStatus::Pending),
        Some("all") => None,
        Some(raw) => Some(
            ScanStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown status '{raw}'")))?,
        ),
    };
    let sort = match &params.sort {
        Some(raw) => ScanSort::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort column '{raw}'")))?,
        None => ScanSort::default(),
    };
    let order = match &params.order {
        Some(raw) => SortOrder::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort order '{raw}'")))?,
        None => SortOrder::Desc,
    };
    let page = Page::new(params.page.unwrap_or(1), state.config.pagination.books);

    let (items, total) = scanned::list_scanned(&state.db, status, sort, order, page).await?;
    let stats = scanned::stats(&state.db).await?;
    Ok(Json(ScanListResponse {
        page: Paginated::new(items, total, page),
        stats,
    }))
}

/// POST /scan/{id}/skip
pub async fn skip(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    state.import.skip(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /scan/{id}/unskip
pub async fn unskip(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    state.import.unskip(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /scan/{id}/review
pub async fn review(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    state.import.review(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /scan/{id}
pub async fn delete_scan(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    state.import.delete(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /scan/{id}/promote: commit a staged record into the catalog
pub async fn promote(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(request): Json<PromoteRequest>,
) -> ApiResult<Json<BookView>> {
    let book = state.import.promote(&ctx, id, request).await?;
    let authors = crate::db::books::get_book_authors(&state.db, book.id).await?;
    Ok(Json(BookView {
        tag: book.tag(),
        book,
        authors,
    }))
}

/// POST /scan/parse-authors: resolver preview for the review form
pub async fn parse_authors(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Json(request): Json<ParseAuthorsRequest>,
) -> ApiResult<Json<Vec<AuthorCandidate>>> {
    let candidates =
        crate::import::authors::parse_and_match(&state.db, &request.authors_raw).await?;
    Ok(Json(candidates))
}

/// GET /scan/preview-tag: what tag the next book in a category gets
pub async fn preview_tag(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(params): Query<PreviewTagParams>,
) -> ApiResult<Json<PreviewTagResponse>> {
    let (tag, next_number) = state
        .import
        .preview_tag(&params.category, &params.maincategory)
        .await?;
    Ok(Json(PreviewTagResponse { tag, next_number }))
}

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/scan", post(scan_isbn).get(list_scans))
        .route("/scan/manual", post(add_manual))
        .route("/scan/parse-authors", post(parse_authors))
        .route("/scan/preview-tag", get(preview_tag))
        .route("/scan/:id", delete(delete_scan))
        .route("/scan/:id/skip", post(skip))
        .route("/scan/:id/unskip", post(unskip))
        .route("/scan/:id/review", post(review))
        .route("/scan/:id/promote", post(promote))
}
