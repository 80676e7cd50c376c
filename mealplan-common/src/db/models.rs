//! Database models
//!
//! Field names serialize in camelCase, which is what the browser client reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Meal-time bucket within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Slot {
    Breakfast,
    Lunch,
    Dinner,
    Other,
}

impl Slot {
    /// Slots in display order
    pub const ALL: [Slot; 4] = [Slot::Breakfast, Slot::Lunch, Slot::Dinner, Slot::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Breakfast => "BREAKFAST",
            Slot::Lunch => "LUNCH",
            Slot::Dinner => "DINNER",
            Slot::Other => "OTHER",
        }
    }

    /// Display order, 1 (breakfast) through 4 (other)
    pub fn order(&self) -> u8 {
        match self {
            Slot::Breakfast => 1,
            Slot::Lunch => 2,
            Slot::Dinner => 3,
            Slot::Other => 4,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BREAKFAST" => Ok(Slot::Breakfast),
            "LUNCH" => Ok(Slot::Lunch),
            "DINNER" => Ok(Slot::Dinner),
            "OTHER" => Ok(Slot::Other),
            other => Err(Error::InvalidInput(format!("Invalid slot: {}", other))),
        }
    }
}

/// Login account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Meal category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Category name and color embedded in dashboard payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryLabel {
    pub name: String,
    pub color: Option<String>,
}

/// Cataloged meal with its category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: i64,
    pub title: String,
    pub category_id: Option<i64>,
    pub rating: i64,
    pub image_url: Option<String>,
    pub recipe_text: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub category: Option<Category>,
}

impl Meal {
    /// Whether the meal has a non-empty recipe
    pub fn has_recipe(&self) -> bool {
        self.recipe_text
            .as_deref()
            .map(|text| !text.is_empty())
            .unwrap_or(false)
    }
}

/// Assignment of a meal to a day and slot within a weekly plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMeal {
    pub id: i64,
    pub weekly_plan_id: i64,
    pub meal_id: i64,
    pub day_of_week: i64,
    pub slot: Slot,
    pub position: i64,
    pub created_at: String,
    pub meal: Meal,
}

/// Plan for one ISO week, anchored to its Monday
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlan {
    pub id: i64,
    pub week_start_date: NaiveDate,
    pub created_at: String,
    pub updated_at: String,
    pub planned_meals: Vec<PlannedMeal>,
}
