//! Category endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mealplan_common::db::Category;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{nullable, parse_id, ApiJson};
use crate::db::categories::{self, CategoryUpdate, CategoryWithCount};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub color: Option<Option<String>>,
}

fn category_not_found() -> ApiError {
    ApiError::NotFound("Category not found".to_string())
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategoryWithCount>>> {
    Ok(Json(categories::list_with_counts(&state.db).await?))
}

/// POST /api/categories
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Category name is required".to_string()))?;
    let color = req.color.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let category = categories::create(&state.db, name, color).await?;
    info!("Created category {} '{}'", category.id, category.name);
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/categories/:id
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    let id = parse_id(&id, "category")?;
    let changes = CategoryUpdate {
        name: req.name,
        color: req.color,
    };

    let category = categories::update(&state.db, id, &changes)
        .await?
        .ok_or_else(category_not_found)?;
    Ok(Json(category))
}

/// DELETE /api/categories/:id
///
/// Meals in the category become uncategorized.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "category")?;
    if !categories::delete(&state.db, id).await? {
        return Err(category_not_found());
    }

    info!("Deleted category {}", id);
    Ok(Json(json!({ "success": true })))
}
