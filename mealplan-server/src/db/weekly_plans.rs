//! Weekly plans, one per ISO week, keyed by the week's Monday
//!
//! Every operation normalizes the given date to the Monday of its week, so a
//! plan can never be stored under another weekday.

use chrono::NaiveDate;
use mealplan_common::calendar::{format_iso_date, monday_of, parse_iso_date};
use mealplan_common::db::WeeklyPlan;
use mealplan_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{decode_error, is_unique_violation, planned_meals};

/// Plan row without its planned meals
fn plan_from_row(row: &SqliteRow) -> sqlx::Result<WeeklyPlan> {
    let week_start: String = row.try_get("week_start_date")?;

    Ok(WeeklyPlan {
        id: row.try_get("id")?,
        week_start_date: parse_iso_date(&week_start).map_err(decode_error)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        planned_meals: Vec::new(),
    })
}

async fn with_planned_meals(pool: &SqlitePool, mut plan: WeeklyPlan) -> Result<WeeklyPlan> {
    plan.planned_meals = planned_meals::list_for_plan(pool, plan.id).await?;
    Ok(plan)
}

/// Plan for the week containing `date`, with its planned meals
pub async fn find_by_week_start(pool: &SqlitePool, date: NaiveDate) -> Result<Option<WeeklyPlan>> {
    let row = sqlx::query(
        "SELECT id, week_start_date, created_at, updated_at FROM weekly_plans WHERE week_start_date = ?",
    )
    .bind(format_iso_date(monday_of(date)))
    .fetch_optional(pool)
    .await?;

    match row.as_ref().map(plan_from_row).transpose()? {
        Some(plan) => Ok(Some(with_planned_meals(pool, plan).await?)),
        None => Ok(None),
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<WeeklyPlan>> {
    let row = sqlx::query(
        "SELECT id, week_start_date, created_at, updated_at FROM weekly_plans WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row.as_ref().map(plan_from_row).transpose()? {
        Some(plan) => Ok(Some(with_planned_meals(pool, plan).await?)),
        None => Ok(None),
    }
}

/// Plan for the week containing `date`, created empty when missing
pub async fn get_or_create(pool: &SqlitePool, date: NaiveDate) -> Result<WeeklyPlan> {
    sqlx::query("INSERT OR IGNORE INTO weekly_plans (week_start_date) VALUES (?)")
        .bind(format_iso_date(monday_of(date)))
        .execute(pool)
        .await?;

    find_by_week_start(pool, date)
        .await?
        .ok_or_else(|| Error::Internal("Weekly plan missing after insert".to_string()))
}

/// Create the plan for the week containing `date`
///
/// `Error::Conflict` when that week already has a plan.
pub async fn create(pool: &SqlitePool, date: NaiveDate) -> Result<WeeklyPlan> {
    let result = sqlx::query("INSERT INTO weekly_plans (week_start_date) VALUES (?)")
        .bind(format_iso_date(monday_of(date)))
        .execute(pool)
        .await;

    match result {
        Ok(done) => find_by_id(pool, done.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::Internal("Inserted weekly plan vanished".to_string())),
        Err(e) if is_unique_violation(&e) => Err(Error::Conflict(
            "Weekly plan already exists for this date".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Plans whose Monday falls within `start..=end`, oldest first
pub async fn find_by_range(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<WeeklyPlan>> {
    let rows = sqlx::query(
        r#"
        SELECT id, week_start_date, created_at, updated_at
        FROM weekly_plans
        WHERE week_start_date >= ? AND week_start_date <= ?
        ORDER BY week_start_date
        "#,
    )
    .bind(format_iso_date(start))
    .bind(format_iso_date(end))
    .fetch_all(pool)
    .await?;

    let mut plans = Vec::with_capacity(rows.len());
    for row in &rows {
        let plan = plan_from_row(row)?;
        plans.push(with_planned_meals(pool, plan).await?);
    }
    Ok(plans)
}
