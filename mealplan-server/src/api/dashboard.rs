//! Dashboard endpoints: metrics, month calendar and day detail

use axum::{
    extract::{Query, State},
    Json,
};
use mealplan_common::calendar::{
    calendar_grid, day_of_week, format_date_long, format_iso_date, month_name, parse_iso_date,
    CalendarDay,
};
use mealplan_common::time;
use serde::{Deserialize, Serialize};

use crate::db::dashboard::{self, DashboardMetrics, DayMealSummary, DayMeals};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub week_start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayDetailQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResponse {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub days_with_meals: Vec<DayMealSummary>,
    /// Grid rows, Monday first
    pub weeks: Vec<[CalendarDay; 7]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetailResponse {
    pub date: String,
    /// "Wednesday, January 8, 2025"
    pub date_label: String,
    pub day_of_week: u8,
    pub meals: DayMeals,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// GET /api/dashboard/metrics[?weekStartDate=YYYY-MM-DD]
///
/// Week coverage defaults to the current week.
pub async fn get_metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> ApiResult<Json<DashboardMetrics>> {
    let week = match non_empty(query.week_start_date.as_deref()) {
        Some(raw) => parse_iso_date(raw)
            .map_err(|_| ApiError::BadRequest("Invalid date format".to_string()))?,
        None => time::today(),
    };

    Ok(Json(dashboard::metrics(&state.db, week).await?))
}

/// GET /api/dashboard/calendar?year=YYYY&month=M
pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<CalendarResponse>> {
    let (Some(year), Some(month)) = (
        non_empty(query.year.as_deref()),
        non_empty(query.month.as_deref()),
    ) else {
        return Err(ApiError::BadRequest(
            "Year and month parameters are required".to_string(),
        ));
    };

    let invalid = || ApiError::BadRequest("Invalid year or month parameter".to_string());
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let grid = calendar_grid(year, month, time::today()).map_err(|_| invalid())?;
    let (start, end) = grid.range().ok_or_else(invalid)?;

    let days_with_meals = dashboard::days_with_meals(&state.db, start, end).await?;

    Ok(Json(CalendarResponse {
        year,
        month,
        month_name: month_name(month),
        days_with_meals,
        weeks: grid.weeks,
    }))
}

/// GET /api/dashboard/day-detail?date=YYYY-MM-DD
pub async fn get_day_detail(
    State(state): State<AppState>,
    Query(query): Query<DayDetailQuery>,
) -> ApiResult<Json<DayDetailResponse>> {
    let raw = non_empty(query.date.as_deref()).ok_or_else(|| {
        ApiError::BadRequest("Date parameter is required (YYYY-MM-DD)".to_string())
    })?;
    let date = parse_iso_date(raw)
        .map_err(|_| ApiError::BadRequest("Invalid date format. Use YYYY-MM-DD".to_string()))?;

    let meals = dashboard::day_meals(&state.db, date).await?;

    Ok(Json(DayDetailResponse {
        date: format_iso_date(date),
        date_label: format_date_long(date),
        day_of_week: day_of_week(date),
        meals,
    }))
}
