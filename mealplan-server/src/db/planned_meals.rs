//! Planned meals: meals assigned to a day and slot of a weekly plan

use mealplan_common::calendar::is_valid_day_of_week;
use mealplan_common::db::{PlannedMeal, Slot};
use mealplan_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::meals::{meal_from_row, CATEGORY_JOIN, MEAL_COLUMNS};
use super::decode_error;

/// Sort key placing slots in display order (BREAKFAST first)
pub(crate) const SLOT_ORDER_SQL: &str = "CASE pm.slot \
    WHEN 'BREAKFAST' THEN 1 WHEN 'LUNCH' THEN 2 WHEN 'DINNER' THEN 3 ELSE 4 END";

const PLANNED_COLUMNS: &str = "\
    pm.id AS pm_id, pm.weekly_plan_id AS pm_weekly_plan_id, pm.meal_id AS pm_meal_id, \
    pm.day_of_week AS pm_day_of_week, pm.slot AS pm_slot, pm.position AS pm_position, \
    pm.created_at AS pm_created_at";

/// Fields of a new planned meal
#[derive(Debug, Clone)]
pub struct NewPlannedMeal {
    pub weekly_plan_id: i64,
    pub meal_id: i64,
    pub day_of_week: i64,
    pub slot: Slot,
    pub position: i64,
}

/// Move or reorder; absent fields keep their value
#[derive(Debug, Clone, Default)]
pub struct PlannedMealMove {
    pub day_of_week: Option<i64>,
    pub slot: Option<Slot>,
    pub position: Option<i64>,
}

fn select_sql(filter: &str) -> String {
    format!(
        "SELECT {}, {} FROM planned_meals pm \
         JOIN meals m ON m.id = pm.meal_id {} \
         WHERE {} \
         ORDER BY pm.day_of_week, {}, pm.position, pm.id",
        PLANNED_COLUMNS, MEAL_COLUMNS, CATEGORY_JOIN, filter, SLOT_ORDER_SQL
    )
}

pub(crate) fn planned_meal_from_row(row: &SqliteRow) -> sqlx::Result<PlannedMeal> {
    let slot: String = row.try_get("pm_slot")?;

    Ok(PlannedMeal {
        id: row.try_get("pm_id")?,
        weekly_plan_id: row.try_get("pm_weekly_plan_id")?,
        meal_id: row.try_get("pm_meal_id")?,
        day_of_week: row.try_get("pm_day_of_week")?,
        slot: slot.parse::<Slot>().map_err(decode_error)?,
        position: row.try_get("pm_position")?,
        created_at: row.try_get("pm_created_at")?,
        meal: meal_from_row(row)?,
    })
}

fn validate_day(day_of_week: i64) -> Result<()> {
    if !is_valid_day_of_week(day_of_week) {
        return Err(Error::InvalidInput(
            "dayOfWeek must be between 1 and 7".to_string(),
        ));
    }
    Ok(())
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<PlannedMeal>> {
    let row = sqlx::query(&select_sql("pm.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(planned_meal_from_row).transpose()?)
}

/// Planned meals of one plan, ordered by day, slot and position
pub async fn list_for_plan(pool: &SqlitePool, weekly_plan_id: i64) -> Result<Vec<PlannedMeal>> {
    let rows = sqlx::query(&select_sql("pm.weekly_plan_id = ?"))
        .bind(weekly_plan_id)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(planned_meal_from_row)
        .collect::<sqlx::Result<Vec<_>>>()?)
}

/// Assign a meal to a plan slot
///
/// Unknown plan or meal is `Error::InvalidInput`.
pub async fn create(pool: &SqlitePool, new: &NewPlannedMeal) -> Result<PlannedMeal> {
    validate_day(new.day_of_week)?;

    let references_exist: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(SELECT 1 FROM weekly_plans WHERE id = ?)
           AND EXISTS(SELECT 1 FROM meals WHERE id = ?)
        "#,
    )
    .bind(new.weekly_plan_id)
    .bind(new.meal_id)
    .fetch_one(pool)
    .await?;

    if !references_exist {
        return Err(Error::InvalidInput(
            "Invalid weeklyPlanId or mealId".to_string(),
        ));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO planned_meals (weekly_plan_id, meal_id, day_of_week, slot, position)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(new.weekly_plan_id)
    .bind(new.meal_id)
    .bind(new.day_of_week)
    .bind(new.slot.as_str())
    .bind(new.position)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE weekly_plans SET updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(new.weekly_plan_id)
        .execute(pool)
        .await?;

    find(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| Error::Internal("Inserted planned meal vanished".to_string()))
}

/// Move a planned meal to another day / slot or change its position
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    changes: &PlannedMealMove,
) -> Result<Option<PlannedMeal>> {
    if let Some(day) = changes.day_of_week {
        validate_day(day)?;
    }

    let Some(current) = find(pool, id).await? else {
        return Ok(None);
    };

    sqlx::query("UPDATE planned_meals SET day_of_week = ?, slot = ?, position = ? WHERE id = ?")
        .bind(changes.day_of_week.unwrap_or(current.day_of_week))
        .bind(changes.slot.unwrap_or(current.slot).as_str())
        .bind(changes.position.unwrap_or(current.position))
        .bind(id)
        .execute(pool)
        .await?;

    find(pool, id).await
}

/// Remove a planned meal; false when it does not exist
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM planned_meals WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::meals::{self, NewMeal};
    use crate::db::test_support::test_pool;
    use crate::db::weekly_plans;
    use chrono::NaiveDate;

    async fn fixture(pool: &SqlitePool) -> (i64, i64) {
        let monday = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        let plan = weekly_plans::get_or_create(pool, monday).await.unwrap();
        let meal = meals::create(
            pool,
            NewMeal {
                title: "Pancakes".to_string(),
                rating: 5,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (plan.id, meal.id)
    }

    fn planned(plan: i64, meal: i64, day: i64, slot: Slot, position: i64) -> NewPlannedMeal {
        NewPlannedMeal {
            weekly_plan_id: plan,
            meal_id: meal,
            day_of_week: day,
            slot,
            position,
        }
    }

    #[tokio::test]
    async fn test_create_embeds_meal() {
        let (_dir, pool) = test_pool().await;
        let (plan, meal) = fixture(&pool).await;

        let pm = create(&pool, &planned(plan, meal, 1, Slot::Breakfast, 0))
            .await
            .unwrap();
        assert_eq!(pm.day_of_week, 1);
        assert_eq!(pm.slot, Slot::Breakfast);
        assert_eq!(pm.meal.title, "Pancakes");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_references_and_days() {
        let (_dir, pool) = test_pool().await;
        let (plan, meal) = fixture(&pool).await;

        let err = create(&pool, &planned(plan, 999, 1, Slot::Lunch, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "Invalid weeklyPlanId or mealId"));

        let err = create(&pool, &planned(plan, meal, 8, Slot::Lunch, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ordering_by_day_slot_position() {
        let (_dir, pool) = test_pool().await;
        let (plan, meal) = fixture(&pool).await;

        let dinner = create(&pool, &planned(plan, meal, 2, Slot::Dinner, 0)).await.unwrap();
        let lunch_b = create(&pool, &planned(plan, meal, 2, Slot::Lunch, 1)).await.unwrap();
        let lunch_a = create(&pool, &planned(plan, meal, 2, Slot::Lunch, 0)).await.unwrap();
        let monday = create(&pool, &planned(plan, meal, 1, Slot::Other, 0)).await.unwrap();

        let ids: Vec<i64> = list_for_plan(&pool, plan)
            .await
            .unwrap()
            .iter()
            .map(|pm| pm.id)
            .collect();
        assert_eq!(ids, vec![monday.id, lunch_a.id, lunch_b.id, dinner.id]);
    }

    #[tokio::test]
    async fn test_move_and_delete() {
        let (_dir, pool) = test_pool().await;
        let (plan, meal) = fixture(&pool).await;
        let pm = create(&pool, &planned(plan, meal, 1, Slot::Breakfast, 0))
            .await
            .unwrap();

        let moved = update(
            &pool,
            pm.id,
            &PlannedMealMove {
                day_of_week: Some(5),
                slot: Some(Slot::Dinner),
                position: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(moved.day_of_week, 5);
        assert_eq!(moved.slot, Slot::Dinner);
        assert_eq!(moved.position, 0);

        assert!(update(&pool, 999, &PlannedMealMove::default())
            .await
            .unwrap()
            .is_none());

        assert!(delete(&pool, pm.id).await.unwrap());
        assert!(!delete(&pool, pm.id).await.unwrap());
    }
}
