//! CSV/JSON export handlers
//!
//! Each export walks the full table set (no pagination) and streams back a
//! download attachment.

use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;

use crate::context::RequestContext;
use crate::db::{authors, books, categories, wishlist};
use crate::error::{ApiError, ApiResult};
use crate::export::{csv_response, json_response, to_csv};
use crate::query::Page;
use crate::AppState;

/// Page size large enough to cover a personal catalog in one sweep
const EXPORT_PAGE: u32 = 100_000;

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_num(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

async fn books_rows(state: &AppState) -> ApiResult<Vec<(obm_common::db::Book, String)>> {
    let (all, _) = books::list_books(
        &state.db,
        &books::BookListQuery {
            sort: crate::query::BookSort::Tag,
            ..Default::default()
        },
        Page::new(1, EXPORT_PAGE),
    )
    .await?;

    let mut rows = Vec::with_capacity(all.len());
    for book in all {
        let authors = books::get_book_authors(&state.db, book.id).await?;
        let names = authors
            .iter()
            .map(|a| {
                if a.first_name.is_empty() {
                    a.last_name.clone()
                } else {
                    format!("{} {}", a.first_name, a.last_name)
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        rows.push((book, names));
    }
    Ok(rows)
}

/// GET /exports/{entity}.{format}
pub async fn export(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(target): Path<String>,
) -> ApiResult<Response> {
    match target.as_str() {
        "books.csv" => {
            let rows = books_rows(&state).await?;
            let data: Vec<Vec<String>> = rows
                .iter()
                .map(|(book, authors)| {
                    vec![
                        book.tag(),
                        book.title.clone(),
                        opt(&book.subtitle),
                        authors.clone(),
                        opt_num(book.year),
                        opt(&book.isbn),
                        opt(&book.publisher),
                        opt(&book.language),
                        opt_num(book.pages),
                        opt(&book.notes),
                    ]
                })
                .collect();
            let csv = to_csv(
                &[
                    "tag", "title", "subtitle", "authors", "year", "isbn", "publisher",
                    "language", "pages", "notes",
                ],
                &data,
            );
            Ok(csv_response("books.csv", csv))
        }
        "books.json" => {
            let rows = books_rows(&state).await?;
            let value = json!(rows
                .iter()
                .map(|(book, authors)| json!({
                    "tag": book.tag(),
                    "title": book.title,
                    "subtitle": book.subtitle,
                    "authors": authors,
                    "year": book.year,
                    "isbn": book.isbn,
                    "publisher": book.publisher,
                    "language": book.language,
                    "pages": book.pages,
                    "notes": book.notes,
                }))
                .collect::<Vec<_>>());
            Ok(json_response("books.json", &value))
        }
        "authors.csv" => {
            let (all, _) = authors::list_authors(&state.db, Page::new(1, EXPORT_PAGE)).await?;
            let data: Vec<Vec<String>> = all
                .iter()
                .map(|a| {
                    vec![
                        a.last_name.clone(),
                        a.first_name.clone(),
                        a.book_count.to_string(),
                    ]
                })
                .collect();
            Ok(csv_response(
                "authors.csv",
                to_csv(&["last_name", "first_name", "books"], &data),
            ))
        }
        "authors.json" => {
            let (all, _) = authors::list_authors(&state.db, Page::new(1, EXPORT_PAGE)).await?;
            Ok(json_response("authors.json", &json!(all)))
        }
        "categories.csv" => {
            let all = categories::list_categories(&state.db).await?;
            let data: Vec<Vec<String>> = all
                .iter()
                .map(|c| {
                    vec![
                        c.code_maincategory.clone(),
                        c.maincategory_title.clone(),
                        c.code.clone(),
                        c.title.clone(),
                        c.book_count.to_string(),
                    ]
                })
                .collect();
            Ok(csv_response(
                "categories.csv",
                to_csv(
                    &["maincategory", "maincategory_title", "code", "title", "books"],
                    &data,
                ),
            ))
        }
        "categories.json" => {
            let all = categories::list_categories(&state.db).await?;
            Ok(json_response("categories.json", &json!(all)))
        }
        "wishlist.csv" => {
            let (all, _) = wishlist::list_items(&state.db, Page::new(1, EXPORT_PAGE)).await?;
            let data: Vec<Vec<String>> = all
                .iter()
                .map(|item| {
                    vec![
                        item.title.clone(),
                        opt(&item.author_name),
                        opt(&item.notes),
                    ]
                })
                .collect();
            Ok(csv_response(
                "wishlist.csv",
                to_csv(&["title", "author", "notes"], &data),
            ))
        }
        "wishlist.json" => {
            let (all, _) = wishlist::list_items(&state.db, Page::new(1, EXPORT_PAGE)).await?;
            Ok(json_response("wishlist.json", &json!(all)))
        }
        other => Err(ApiError::NotFound(format!("Unknown export '{other}'"))),
    }
}

pub fn export_routes() -> Router<AppState> {
    Router::new().route("/exports/:target", get(export))
}
