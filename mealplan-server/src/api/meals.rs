//! Meal catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use mealplan_common::db::Meal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{nullable, parse_id, ApiJson};
use crate::db::meals::{self, MealUpdate, NewMeal};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMealsQuery {
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealRequest {
    pub title: Option<String>,
    pub category_id: Option<i64>,
    pub rating: Option<i64>,
    pub image_url: Option<String>,
    pub recipe_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMealRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
    pub rating: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub recipe_text: Option<Option<String>>,
}

fn meal_not_found() -> ApiError {
    ApiError::NotFound("Meal not found".to_string())
}

/// GET /api/meals[?categoryId=N]
pub async fn list_meals(
    State(state): State<AppState>,
    Query(query): Query<ListMealsQuery>,
) -> ApiResult<Json<Vec<Meal>>> {
    let category_id = match query.category_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| ApiError::BadRequest("Invalid categoryId".to_string()))?,
        ),
    };

    Ok(Json(meals::list(&state.db, category_id).await?))
}

/// POST /api/meals
pub async fn create_meal(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateMealRequest>,
) -> ApiResult<(StatusCode, Json<Meal>)> {
    let title = req
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Meal title is required".to_string()))?;

    let meal = meals::create(
        &state.db,
        NewMeal {
            title,
            category_id: req.category_id,
            rating: req.rating.unwrap_or(0),
            image_url: req.image_url,
            recipe_text: req.recipe_text,
        },
    )
    .await?;

    info!("Created meal {} '{}'", meal.id, meal.title);
    Ok((StatusCode::CREATED, Json(meal)))
}

/// GET /api/meals/:id
pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Meal>> {
    let id = parse_id(&id, "meal")?;
    let meal = meals::find(&state.db, id).await?.ok_or_else(meal_not_found)?;
    Ok(Json(meal))
}

/// PATCH /api/meals/:id
///
/// When the image changes, the previously uploaded file is removed.
pub async fn update_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateMealRequest>,
) -> ApiResult<Json<Meal>> {
    let id = parse_id(&id, "meal")?;
    let previous = meals::find(&state.db, id).await?.ok_or_else(meal_not_found)?;

    let changes = MealUpdate {
        title: req.title,
        category_id: req.category_id,
        rating: req.rating,
        image_url: req.image_url,
        recipe_text: req.recipe_text,
    };
    let meal = meals::update(&state.db, id, changes)
        .await?
        .ok_or_else(meal_not_found)?;

    if let Some(old_url) = previous.image_url.as_deref() {
        if meal.image_url.as_deref() != Some(old_url) {
            state.uploads.remove_quietly(old_url).await;
        }
    }

    Ok(Json(meal))
}

/// DELETE /api/meals/:id
pub async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "meal")?;
    let meal = meals::delete(&state.db, id)
        .await?
        .ok_or_else(meal_not_found)?;

    if let Some(url) = meal.image_url.as_deref() {
        state.uploads.remove_quietly(url).await;
    }

    info!("Deleted meal {} '{}'", meal.id, meal.title);
    Ok(Json(json!({ "success": true })))
}
