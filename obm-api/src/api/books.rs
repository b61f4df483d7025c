//! Book CRUD handlers

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use obm_common::db::{Author, Book};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::db::books::{self, BookInput, BookListQuery};
use crate::error::{ApiError, ApiResult};
use crate::providers::remove_cover_file;
use crate::query::{BookSort, Page, Paginated, SortOrder};
use crate::AppState;

/// Book as served by the API: row fields plus derived tag and authors
#[derive(Debug, Serialize)]
pub struct BookView {
    #[serde(flatten)]
    pub book: Book,
    pub tag: String,
    pub authors: Vec<Author>,
}

impl BookView {
    async fn load(state: &AppState, book: Book) -> ApiResult<Self> {
        let authors = books::get_book_authors(&state.db, book.id).await?;
        Ok(Self {
            tag: book.tag(),
            book,
            authors,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BookListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub maincategory: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BookBody {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pages: Option<i64>,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub code_category: String,
    pub code_maincategory: String,
    pub author_ids: Vec<Uuid>,
}

impl BookBody {
    fn into_input(self) -> (BookInput, Vec<Uuid>) {
        let input = BookInput {
            title: self.title,
            subtitle: self.subtitle,
            year: self.year,
            isbn: self.isbn.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            publisher: self.publisher,
            language: self.language,
            notes: self.notes,
            pages: self.pages,
            cover_image: self.cover_image,
            code_category: self.code_category,
            code_maincategory: self.code_maincategory,
        };
        (input, self.author_ids)
    }
}

/// GET /books
pub async fn list_books(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Query(params): Query<BookListParams>,
) -> ApiResult<Json<Paginated<BookView>>> {
    let sort = match &params.sort {
        Some(raw) => BookSort::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort column '{raw}'")))?,
        None => BookSort::default(),
    };
    let order = match &params.order {
        Some(raw) => SortOrder::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown sort order '{raw}'")))?,
        None => SortOrder::default(),
    };
    let category = match (&params.category, &params.maincategory) {
        (Some(code), Some(main)) => Some((code.clone(), main.clone())),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "category and maincategory must be given together".to_string(),
            ))
        }
    };

    let query = BookListQuery {
        search: params.search.clone().filter(|s| !s.trim().is_empty()),
        category,
        sort,
        order,
    };
    let page = Page::new(params.page.unwrap_or(1), state.config.pagination.books);

    let (book_rows, total) = books::list_books(&state.db, &query, page).await?;
    let mut items = Vec::with_capacity(book_rows.len());
    for book in book_rows {
        items.push(BookView::load(&state, book).await?);
    }
    Ok(Json(Paginated::new(items, total, page)))
}

/// GET /books/{id}
pub async fn get_book(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BookView>> {
    let book = books::get_book(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Book {id}")))?;
    Ok(Json(BookView::load(&state, book).await?))
}

/// POST /books
pub async fn create_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(body): Json<BookBody>,
) -> ApiResult<Json<BookView>> {
    let (input, author_ids) = body.into_input();
    let book = books::create_book(&state.db, &input, &author_ids).await?;
    tracing::info!(book_id = %book.id, user = %ctx.principal.username, "Book added");
    Ok(Json(BookView::load(&state, book).await?))
}

/// PUT /books/{id}
pub async fn update_book(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<BookBody>,
) -> ApiResult<Json<BookView>> {
    let (input, author_ids) = body.into_input();
    let book = books::update_book(&state.db, id, &input, &author_ids).await?;
    Ok(Json(BookView::load(&state, book).await?))
}

/// DELETE /books/{id}
pub async fn delete_book(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let cover = books::delete_book(&state.db, id).await?;
    if let Some(cover) = cover {
        // Remote URLs carried from a scan are not local files
        if !cover.starts_with("http") {
            remove_cover_file(&cover);
        }
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
}
