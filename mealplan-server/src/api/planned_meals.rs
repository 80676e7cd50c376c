//! Planned meal endpoints: add, move / reorder and remove plan entries

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mealplan_common::calendar::is_valid_day_of_week;
use mealplan_common::db::{PlannedMeal, Slot};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_id, ApiJson};
use crate::db::planned_meals::{self, NewPlannedMeal, PlannedMealMove};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlannedMealRequest {
    pub weekly_plan_id: Option<i64>,
    pub meal_id: Option<i64>,
    pub day_of_week: Option<i64>,
    pub slot: Option<String>,
    pub position: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlannedMealRequest {
    pub day_of_week: Option<i64>,
    pub slot: Option<String>,
    pub position: Option<i64>,
}

fn check_day(day: i64) -> ApiResult<()> {
    if !is_valid_day_of_week(day) {
        return Err(ApiError::BadRequest(
            "dayOfWeek must be between 1 and 7".to_string(),
        ));
    }
    Ok(())
}

fn parse_slot(raw: &str) -> ApiResult<Slot> {
    raw.parse::<Slot>().map_err(|_| {
        ApiError::BadRequest("Invalid slot. Must be BREAKFAST, LUNCH, DINNER, or OTHER".to_string())
    })
}

fn planned_meal_not_found() -> ApiError {
    ApiError::NotFound("Planned meal not found".to_string())
}

/// POST /api/planned-meals
pub async fn create_planned_meal(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreatePlannedMealRequest>,
) -> ApiResult<(StatusCode, Json<PlannedMeal>)> {
    let (Some(weekly_plan_id), Some(meal_id), Some(day_of_week), Some(slot)) =
        (req.weekly_plan_id, req.meal_id, req.day_of_week, req.slot.as_deref())
    else {
        return Err(ApiError::BadRequest(
            "weeklyPlanId, mealId, dayOfWeek, and slot are required".to_string(),
        ));
    };
    check_day(day_of_week)?;
    let slot = parse_slot(slot)?;

    let planned = planned_meals::create(
        &state.db,
        &NewPlannedMeal {
            weekly_plan_id,
            meal_id,
            day_of_week,
            slot,
            position: req.position.unwrap_or(0),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(planned)))
}

/// PATCH /api/planned-meals/:id
pub async fn update_planned_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePlannedMealRequest>,
) -> ApiResult<Json<PlannedMeal>> {
    let id = parse_id(&id, "planned meal")?;
    if let Some(day) = req.day_of_week {
        check_day(day)?;
    }
    let slot = req.slot.as_deref().map(parse_slot).transpose()?;

    let changes = PlannedMealMove {
        day_of_week: req.day_of_week,
        slot,
        position: req.position,
    };
    let planned = planned_meals::update(&state.db, id, &changes)
        .await?
        .ok_or_else(planned_meal_not_found)?;
    Ok(Json(planned))
}

/// DELETE /api/planned-meals/:id
pub async fn delete_planned_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "planned meal")?;
    if !planned_meals::delete(&state.db, id).await? {
        return Err(planned_meal_not_found());
    }
    Ok(Json(json!({ "success": true })))
}
