//! Weekly plan endpoints and the weekly ingredients review

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use mealplan_common::calendar::{
    format_day_header, format_iso_date, format_week_range, monday_of, parse_iso_date,
};
use mealplan_common::db::{PlannedMeal, Slot, WeeklyPlan};
use serde::{Deserialize, Serialize};

use super::ApiJson;
use crate::db::weekly_plans;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub week_start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWeeklyPlanRequest {
    pub week_start_date: Option<String>,
}

/// One day a meal is planned on, with the slots it fills
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedDay {
    pub day_of_week: u8,
    /// "Mon, Jan 6"
    pub date: String,
    pub slots: Vec<Slot>,
}

/// A meal of the week with every day and slot it is planned for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientMeal {
    pub meal_id: i64,
    pub title: String,
    pub rating: i64,
    pub recipe_text: Option<String>,
    pub image_url: Option<String>,
    pub planned_days: Vec<PlannedDay>,
    pub earliest_day: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientsResponse {
    pub week_start_date: String,
    /// "Jan 6 - 12"
    pub week_label: String,
    pub meals: Vec<IngredientMeal>,
}

/// Parse a week parameter and normalize it to its Monday
fn parse_week(raw: Option<&str>, missing: &str) -> ApiResult<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(missing.to_string()))?;
    let date = parse_iso_date(raw).map_err(|_| ApiError::BadRequest("Invalid date format".to_string()))?;
    Ok(monday_of(date))
}

/// Group a week's planned meals by meal
///
/// Days are sorted, slots deduplicated in slot order, and meals ordered by the
/// first day they appear (ties by title).
pub fn group_ingredients(monday: NaiveDate, planned: &[PlannedMeal]) -> Vec<IngredientMeal> {
    struct Acc<'a> {
        first: &'a PlannedMeal,
        days: BTreeMap<u8, BTreeSet<Slot>>,
    }

    let mut by_meal: BTreeMap<i64, Acc> = BTreeMap::new();
    for pm in planned {
        let Ok(day) = u8::try_from(pm.day_of_week) else {
            continue;
        };
        by_meal
            .entry(pm.meal_id)
            .or_insert_with(|| Acc {
                first: pm,
                days: BTreeMap::new(),
            })
            .days
            .entry(day)
            .or_default()
            .insert(pm.slot);
    }

    let mut meals: Vec<IngredientMeal> = by_meal
        .into_values()
        .map(|acc| {
            let meal = &acc.first.meal;
            let planned_days: Vec<PlannedDay> = acc
                .days
                .into_iter()
                .map(|(day, slots)| PlannedDay {
                    day_of_week: day,
                    date: format_day_header(monday, day),
                    // Slot's Ord follows declaration order: BREAKFAST..OTHER
                    slots: slots.into_iter().collect(),
                })
                .collect();
            IngredientMeal {
                meal_id: meal.id,
                title: meal.title.clone(),
                rating: meal.rating,
                recipe_text: meal.recipe_text.clone(),
                image_url: meal.image_url.clone(),
                earliest_day: planned_days.first().map(|d| d.day_of_week).unwrap_or(0),
                planned_days,
            }
        })
        .collect();

    meals.sort_by(|a, b| {
        a.earliest_day
            .cmp(&b.earliest_day)
            .then_with(|| a.title.cmp(&b.title))
    });
    meals
}

/// GET /api/weekly-plans?weekStartDate=YYYY-MM-DD
///
/// Creates an empty plan when the week has none yet.
pub async fn get_weekly_plan(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> ApiResult<Json<WeeklyPlan>> {
    let monday = parse_week(query.week_start_date.as_deref(), "weekStartDate is required")?;
    Ok(Json(weekly_plans::get_or_create(&state.db, monday).await?))
}

/// POST /api/weekly-plans
pub async fn create_weekly_plan(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateWeeklyPlanRequest>,
) -> ApiResult<(StatusCode, Json<WeeklyPlan>)> {
    let monday = parse_week(req.week_start_date.as_deref(), "weekStartDate is required")?;
    let plan = weekly_plans::create(&state.db, monday).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /api/weekly-plans/ingredients?weekStartDate=YYYY-MM-DD
pub async fn get_ingredients(
    State(state): State<AppState>,
    Query(query): Query<WeekQuery>,
) -> ApiResult<Json<IngredientsResponse>> {
    let monday = parse_week(
        query.week_start_date.as_deref(),
        "weekStartDate parameter is required",
    )?;

    let meals = match weekly_plans::find_by_week_start(&state.db, monday).await? {
        Some(plan) => group_ingredients(monday, &plan.planned_meals),
        None => Vec::new(),
    };

    Ok(Json(IngredientsResponse {
        week_start_date: format_iso_date(monday),
        week_label: format_week_range(monday),
        meals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealplan_common::db::Meal;

    fn meal(id: i64, title: &str) -> Meal {
        Meal {
            id,
            title: title.to_string(),
            category_id: None,
            rating: 3,
            image_url: None,
            recipe_text: Some("Cook".to_string()),
            created_at: String::new(),
            updated_at: String::new(),
            category: None,
        }
    }

    fn planned(id: i64, m: &Meal, day: i64, slot: Slot) -> PlannedMeal {
        PlannedMeal {
            id,
            weekly_plan_id: 1,
            meal_id: m.id,
            day_of_week: day,
            slot,
            position: 0,
            created_at: String::new(),
            meal: m.clone(),
        }
    }

    #[test]
    fn test_group_ingredients() {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let soup = meal(1, "Soup");
        let eggs = meal(2, "Eggs");
        let apple = meal(3, "Apple");

        let planned_meals = vec![
            planned(1, &soup, 3, Slot::Dinner),
            planned(2, &soup, 3, Slot::Lunch),
            planned(3, &soup, 3, Slot::Dinner),
            planned(4, &soup, 5, Slot::Lunch),
            planned(5, &eggs, 1, Slot::Breakfast),
            planned(6, &apple, 3, Slot::Other),
        ];

        let grouped = group_ingredients(monday, &planned_meals);
        let titles: Vec<&str> = grouped.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Eggs", "Apple", "Soup"]);

        let soup = &grouped[2];
        assert_eq!(soup.earliest_day, 3);
        assert_eq!(soup.planned_days.len(), 2);
        assert_eq!(soup.planned_days[0].date, "Wed, Jan 8");
        assert_eq!(soup.planned_days[0].slots, vec![Slot::Lunch, Slot::Dinner]);
        assert_eq!(soup.planned_days[1].day_of_week, 5);
        assert_eq!(soup.planned_days[1].date, "Fri, Jan 10");
    }

    #[test]
    fn test_group_ingredients_empty() {
        let monday = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert!(group_ingredients(monday, &[]).is_empty());
    }

    #[test]
    fn test_parse_week_normalizes() {
        let monday = parse_week(Some("2025-01-09"), "missing").unwrap();
        assert_eq!(monday, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());

        assert!(matches!(
            parse_week(None, "missing"),
            Err(ApiError::BadRequest(ref m)) if m == "missing"
        ));
        assert!(matches!(
            parse_week(Some("01/09/2025"), "missing"),
            Err(ApiError::BadRequest(ref m)) if m == "Invalid date format"
        ));
    }
}
