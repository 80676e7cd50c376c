//! Dashboard aggregates
//!
//! The metrics payload is assembled from independent counts and group-bys that
//! run concurrently on the pool, then merged in memory.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use mealplan_common::calendar::{date_for, format_iso_date, monday_of};
use mealplan_common::db::{CategoryLabel, Slot};
use mealplan_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::weekly_plans;

/// Number of entries in the top-rated and most-planned lists
pub const TOP_LIST_LEN: i64 = 5;

/// Rating at or above which a meal counts as a favorite
pub const FAVORITE_RATING: i64 = 4;

/// Days in a week, the denominator of week coverage
pub const DAYS_PER_WEEK: u32 = 7;

/// Name reported for meals without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category_id: Option<i64>,
    pub category_name: String,
    pub category_color: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedMeal {
    pub id: i64,
    pub title: String,
    pub rating: i64,
    pub image_url: Option<String>,
    pub category: Option<CategoryLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequentMeal {
    pub meal_id: i64,
    pub title: String,
    pub image_url: Option<String>,
    pub plan_count: i64,
    pub category: Option<CategoryLabel>,
}

/// Days of one week with at least one planned meal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCoverage {
    pub total_slots: u32,
    pub filled_slots: u32,
    pub coverage_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_meals: i64,
    pub total_categories: i64,
    pub meals_by_category: Vec<CategoryBreakdown>,
    pub top_rated_meals: Vec<RatedMeal>,
    pub favorite_meals: i64,
    pub average_rating: f64,
    pub meals_with_recipes: i64,
    pub meals_without_recipes: i64,
    pub recipe_completion_rate: u32,
    pub current_week_coverage: WeekCoverage,
    pub most_frequently_planned_meals: Vec<FrequentMeal>,
}

/// Calendar marker for a day with planned meals
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMealSummary {
    pub date: String,
    pub meal_count: i64,
    pub has_breakfast: bool,
    pub has_lunch: bool,
    pub has_dinner: bool,
    pub has_other: bool,
}

impl DayMealSummary {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date: format_iso_date(date),
            meal_count: 0,
            has_breakfast: false,
            has_lunch: false,
            has_dinner: false,
            has_other: false,
        }
    }

    fn add(&mut self, slot: Slot) {
        self.meal_count += 1;
        match slot {
            Slot::Breakfast => self.has_breakfast = true,
            Slot::Lunch => self.has_lunch = true,
            Slot::Dinner => self.has_dinner = true,
            Slot::Other => self.has_other = true,
        }
    }
}

/// Meal as shown in the day detail view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetailMeal {
    pub id: i64,
    pub title: String,
    pub rating: i64,
    pub image_url: Option<String>,
    pub recipe_text: Option<String>,
    pub category: Option<CategoryLabel>,
}

/// Planned meal entry of the day detail view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDetailEntry {
    pub id: i64,
    pub meal: DayDetailMeal,
}

/// Meals of one day grouped by slot, each list ordered by position
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayMeals {
    pub breakfast: Vec<DayDetailEntry>,
    pub lunch: Vec<DayDetailEntry>,
    pub dinner: Vec<DayDetailEntry>,
    pub other: Vec<DayDetailEntry>,
}

impl DayMeals {
    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<DayDetailEntry> {
        match slot {
            Slot::Breakfast => &mut self.breakfast,
            Slot::Lunch => &mut self.lunch,
            Slot::Dinner => &mut self.dinner,
            Slot::Other => &mut self.other,
        }
    }

    pub fn len(&self) -> usize {
        self.breakfast.len() + self.lunch.len() + self.dinner.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `part / total` as a whole percentage, rounded half up; 0 when total is 0
pub fn percentage(part: i64, total: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

fn category_label(row: &SqliteRow) -> sqlx::Result<Option<CategoryLabel>> {
    let name: Option<String> = row.try_get("category_name")?;
    Ok(match name {
        Some(name) => Some(CategoryLabel {
            name,
            color: row.try_get("category_color")?,
        }),
        None => None,
    })
}

// ========================================
// Individual aggregates
// ========================================

pub async fn count_meals(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM meals")
        .fetch_one(pool)
        .await?)
}

pub async fn count_categories(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?)
}

/// Meals rated [`FAVORITE_RATING`] or higher
pub async fn count_favorites(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM meals WHERE rating >= ?")
        .bind(FAVORITE_RATING)
        .fetch_one(pool)
        .await?)
}

/// Mean rating over all meals; 0 when there are none
pub async fn average_rating(pool: &SqlitePool) -> Result<f64> {
    let avg: Option<f64> = sqlx::query_scalar("SELECT AVG(rating) FROM meals")
        .fetch_one(pool)
        .await?;
    Ok(avg.unwrap_or(0.0))
}

/// Meals with a non-empty recipe
pub async fn count_with_recipes(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar(
        "SELECT COUNT(*) FROM meals WHERE recipe_text IS NOT NULL AND recipe_text != ''",
    )
    .fetch_one(pool)
    .await?)
}

/// Meal counts per category, uncategorized meals grouped together
///
/// Largest group first; ties ordered by name.
pub async fn meals_by_category(pool: &SqlitePool) -> Result<Vec<CategoryBreakdown>> {
    let rows = sqlx::query(
        r#"
        SELECT m.category_id, c.name AS category_name, c.color AS category_color,
               COUNT(m.id) AS meal_count
        FROM meals m
        LEFT JOIN categories c ON c.id = m.category_id
        GROUP BY m.category_id
        ORDER BY meal_count DESC, COALESCE(c.name, ?) COLLATE NOCASE
        "#,
    )
    .bind(UNCATEGORIZED)
    .fetch_all(pool)
    .await?;

    let mut breakdown = Vec::with_capacity(rows.len());
    for row in &rows {
        let label = category_label(row)?;
        breakdown.push(CategoryBreakdown {
            category_id: row.try_get("category_id")?,
            category_name: label
                .as_ref()
                .map(|l| l.name.clone())
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            category_color: label.and_then(|l| l.color),
            count: row.try_get("meal_count")?,
        });
    }
    Ok(breakdown)
}

/// Highest rated meals; ties go to the older meal
pub async fn top_rated_meals(pool: &SqlitePool, limit: i64) -> Result<Vec<RatedMeal>> {
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.title, m.rating, m.image_url,
               c.name AS category_name, c.color AS category_color
        FROM meals m
        LEFT JOIN categories c ON c.id = m.category_id
        ORDER BY m.rating DESC, m.id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut meals = Vec::with_capacity(rows.len());
    for row in &rows {
        meals.push(RatedMeal {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            rating: row.try_get("rating")?,
            image_url: row.try_get("image_url")?,
            category: category_label(row)?,
        });
    }
    Ok(meals)
}

/// Meals placed in plans most often, across all weeks
pub async fn most_frequently_planned(pool: &SqlitePool, limit: i64) -> Result<Vec<FrequentMeal>> {
    let rows = sqlx::query(
        r#"
        SELECT pm.meal_id, m.title, m.image_url,
               c.name AS category_name, c.color AS category_color,
               COUNT(pm.id) AS plan_count
        FROM planned_meals pm
        JOIN meals m ON m.id = pm.meal_id
        LEFT JOIN categories c ON c.id = m.category_id
        GROUP BY pm.meal_id
        ORDER BY plan_count DESC, pm.meal_id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut meals = Vec::with_capacity(rows.len());
    for row in &rows {
        meals.push(FrequentMeal {
            meal_id: row.try_get("meal_id")?,
            title: row.try_get("title")?,
            image_url: row.try_get("image_url")?,
            plan_count: row.try_get("plan_count")?,
            category: category_label(row)?,
        });
    }
    Ok(meals)
}

/// Distinct days of the week containing `date` that have a planned meal
pub async fn week_coverage(pool: &SqlitePool, date: NaiveDate) -> Result<WeekCoverage> {
    let filled: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT pm.day_of_week)
        FROM planned_meals pm
        JOIN weekly_plans wp ON wp.id = pm.weekly_plan_id
        WHERE wp.week_start_date = ?
        "#,
    )
    .bind(format_iso_date(monday_of(date)))
    .fetch_one(pool)
    .await?;

    Ok(WeekCoverage {
        total_slots: DAYS_PER_WEEK,
        filled_slots: filled as u32,
        coverage_percentage: percentage(filled, DAYS_PER_WEEK as i64),
    })
}

// ========================================
// Composite views
// ========================================

/// Full dashboard metrics; coverage is for the week containing `week`
pub async fn metrics(pool: &SqlitePool, week: NaiveDate) -> Result<DashboardMetrics> {
    let (
        total_meals,
        total_categories,
        favorite_meals,
        average_rating,
        meals_with_recipes,
        meals_by_category,
        top_rated_meals,
        most_frequently_planned_meals,
        current_week_coverage,
    ) = tokio::try_join!(
        count_meals(pool),
        count_categories(pool),
        count_favorites(pool),
        average_rating(pool),
        count_with_recipes(pool),
        meals_by_category(pool),
        top_rated_meals(pool, TOP_LIST_LEN),
        most_frequently_planned(pool, TOP_LIST_LEN),
        week_coverage(pool, week),
    )?;

    Ok(DashboardMetrics {
        total_meals,
        total_categories,
        meals_by_category,
        top_rated_meals,
        favorite_meals,
        average_rating,
        meals_with_recipes,
        meals_without_recipes: total_meals - meals_with_recipes,
        recipe_completion_rate: percentage(meals_with_recipes, total_meals),
        current_week_coverage,
        most_frequently_planned_meals,
    })
}

/// Days within `start..=end` that have planned meals, sorted by date
pub async fn days_with_meals(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<DayMealSummary>> {
    // Plans starting up to six days before `start` still reach into the range
    let plans = weekly_plans::find_by_range(pool, monday_of(start), end).await?;

    let mut days: BTreeMap<NaiveDate, DayMealSummary> = BTreeMap::new();
    for plan in &plans {
        for pm in &plan.planned_meals {
            let Some(date) = u8::try_from(pm.day_of_week)
                .ok()
                .and_then(|day| date_for(plan.week_start_date, day))
            else {
                continue;
            };
            if date < start || date > end {
                continue;
            }

            days.entry(date)
                .or_insert_with(|| DayMealSummary::empty(date))
                .add(pm.slot);
        }
    }

    debug!(
        "Calendar {}..{}: {} day(s) with meals",
        start,
        end,
        days.len()
    );
    Ok(days.into_values().collect())
}

/// Planned meals of a single date grouped by slot
pub async fn day_meals(pool: &SqlitePool, date: NaiveDate) -> Result<DayMeals> {
    let mut grouped = DayMeals::default();
    let Some(plan) = weekly_plans::find_by_week_start(pool, date).await? else {
        return Ok(grouped);
    };

    let weekday = mealplan_common::calendar::day_of_week(date) as i64;
    // Planned meals arrive ordered by day, slot and position
    for pm in plan.planned_meals.into_iter().filter(|pm| pm.day_of_week == weekday) {
        let category = pm.meal.category.map(|c| CategoryLabel {
            name: c.name,
            color: c.color,
        });
        grouped.slot_mut(pm.slot).push(DayDetailEntry {
            id: pm.id,
            meal: DayDetailMeal {
                id: pm.meal.id,
                title: pm.meal.title,
                rating: pm.meal.rating,
                image_url: pm.meal.image_url,
                recipe_text: pm.meal.recipe_text,
                category,
            },
        });
    }
    Ok(grouped)
}
