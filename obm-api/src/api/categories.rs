//! Category taxonomy handlers
//!
//! The listing groups subcategories under their main categories, mirroring
//! how the review UI presents the taxonomy for category selection.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use obm_common::db::{Category, MainCategory};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::db::categories::{self, CategoryListing};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MainCategoryBody {
    pub code: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub code: String,
    pub code_maincategory: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleBody {
    pub title: String,
}

/// One main category with its subcategories
#[derive(Debug, Serialize)]
pub struct CategoryGroup {
    pub code: String,
    pub title: String,
    pub subcategories: Vec<CategoryListing>,
}

/// GET /categories: full taxonomy grouped by main category
pub async fn list_categories(
    State(state): State<AppState>,
    _ctx: RequestContext,
) -> ApiResult<Json<Vec<CategoryGroup>>> {
    let mains = categories::list_maincategories(&state.db).await?;
    let subs = categories::list_categories(&state.db).await?;

    let groups = mains
        .into_iter()
        .map(|main| {
            let subcategories = subs
                .iter()
                .filter(|s| s.code_maincategory == main.code)
                .cloned()
                .collect();
            CategoryGroup {
                code: main.code,
                title: main.title,
                subcategories,
            }
        })
        .collect();
    Ok(Json(groups))
}

/// POST /categories/main
pub async fn create_maincategory(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(body): Json<MainCategoryBody>,
) -> ApiResult<Json<MainCategory>> {
    let created = categories::create_maincategory(&state.db, &body.code, &body.title).await?;
    tracing::info!(code = %created.code, user = %ctx.principal.username, "Main category created");
    Ok(Json(created))
}

/// PUT /categories/main/{code}
pub async fn update_maincategory(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(code): Path<String>,
    Json(body): Json<TitleBody>,
) -> ApiResult<Json<serde_json::Value>> {
    categories::update_maincategory(&state.db, &code, &body.title).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /categories/main/{code}
pub async fn delete_maincategory(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path(code): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    categories::delete_maincategory(&state.db, &code).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /categories/sub
pub async fn create_category(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(body): Json<CategoryBody>,
) -> ApiResult<Json<Category>> {
    let created =
        categories::create_category(&state.db, &body.code, &body.code_maincategory, &body.title)
            .await?;
    tracing::info!(
        code = %format!("{}/{}", created.code_maincategory, created.code),
        user = %ctx.principal.username,
        "Subcategory created"
    );
    Ok(Json(created))
}

/// PUT /categories/sub/{main}/{code}
pub async fn update_category(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path((main, code)): Path<(String, String)>,
    Json(body): Json<TitleBody>,
) -> ApiResult<Json<serde_json::Value>> {
    categories::update_category(&state.db, &code, &main, &body.title).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /categories/sub/{main}/{code}
pub async fn delete_category(
    State(state): State<AppState>,
    _ctx: RequestContext,
    Path((main, code)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    categories::delete_category(&state.db, &code, &main).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/main", post(create_maincategory))
        .route(
            "/categories/main/:code",
            put(update_maincategory).delete(delete_maincategory),
        )
        .route("/categories/sub", post(create_category))
        .route(
            "/categories/sub/:main/:code",
            put(update_category).delete(delete_category),
        )
}
