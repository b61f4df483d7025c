//! Author CRUD handlers

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use obm_common::db::Author;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::db::authors::{self, AuthorListing};
use crate::error::{ApiError, ApiResult};
use crate::query::{Page, Paginated};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthorListParams {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorBody {
    #[serde(default)]
    pub first_name: String,
    pub last_name: String,
}

/// Author detail with their catalog books
#[derive(Debug, Serialize)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub books: Vec<AuthorBookView>,
}

#[derive(Debug, Serialize)]
pub struct AuthorBookView {
    pub id: Uuid,
    pub title: String,
    pub tag: String,
}

/// GET /authors
pub async fn list_authors(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(params): Query<AuthorListParams>,
) -> ApiResult<Json<Paginated<AuthorListing>>> {
    let page = Page::new(params.page.unwrap_or(1), state.config.pagination.authors);
    let (items, total) = authors::list_authors(&state.db, page).await?;
    Ok(Json(Paginated::new(items, total, page)))
}

/// GET /authors/{id}
pub async fn get_author(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AuthorDetail>> {
    let author = authors::get_author(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Author {id}")))?;

    let books = crate::db::books::list_books_by_author(&state.db, id)
        .await?
        .iter()
        .map(|book| AuthorBookView {
            id: book.id,
            title: book.title.clone(),
            tag: book.tag(),
        })
        .collect();

    Ok(Json(AuthorDetail { author, books }))
}

/// POST /authors
pub async fn create_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(body): Json<AuthorBody>,
) -> ApiResult<Json<Author>> {
    let author = authors::create_author(&state.db, &body.first_name, &body.last_name).await?;
    tracing::info!(author_id = %author.id, user = %ctx.principal.username, "Author added");
    Ok(Json(author))
}

/// PUT /authors/{id}
pub async fn update_author(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<AuthorBody>,
) -> ApiResult<Json<Author>> {
    authors::update_author(&state.db, id, &body.first_name, &body.last_name).await?;
    let author = authors::get_author(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Author {id}")))?;
    Ok(Json(author))
}

/// DELETE /authors/{id}
pub async fn delete_author(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    authors::delete_author(&state.db, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn author_routes() -> Router<AppState> {
    Router::new()
        .route("/authors", get(list_authors).post(create_author))
        .route(
            "/authors/:id",
            get(get_author).put(update_author).delete(delete_author),
        )
}
