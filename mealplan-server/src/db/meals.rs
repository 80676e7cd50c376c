//! Meal catalog

use mealplan_common::db::{Category, Meal};
use mealplan_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Meal columns plus the joined category, for use after `FROM meals m`
pub(crate) const MEAL_COLUMNS: &str = "\
    m.id AS meal_id, m.title, m.category_id, m.rating, m.image_url, m.recipe_text, \
    m.created_at AS meal_created_at, m.updated_at AS meal_updated_at, \
    c.name AS category_name, c.color AS category_color, \
    c.created_at AS category_created_at, c.updated_at AS category_updated_at";

/// Join completing [`MEAL_COLUMNS`]
pub(crate) const CATEGORY_JOIN: &str = "LEFT JOIN categories c ON c.id = m.category_id";

/// Highest allowed rating
pub const MAX_RATING: i64 = 5;

/// Fields of a new meal
#[derive(Debug, Clone, Default)]
pub struct NewMeal {
    pub title: String,
    pub category_id: Option<i64>,
    pub rating: i64,
    pub image_url: Option<String>,
    pub recipe_text: Option<String>,
}

/// Partial meal update; `Some(None)` clears a nullable field
#[derive(Debug, Clone, Default)]
pub struct MealUpdate {
    pub title: Option<String>,
    pub category_id: Option<Option<i64>>,
    pub rating: Option<i64>,
    pub image_url: Option<Option<String>>,
    pub recipe_text: Option<Option<String>>,
}

/// Map a row selected with [`MEAL_COLUMNS`]
pub(crate) fn meal_from_row(row: &SqliteRow) -> sqlx::Result<Meal> {
    let category_id: Option<i64> = row.try_get("category_id")?;
    let category_name: Option<String> = row.try_get("category_name")?;

    let category = match (category_id, category_name) {
        (Some(id), Some(name)) => Some(Category {
            id,
            name,
            color: row.try_get("category_color")?,
            created_at: row.try_get("category_created_at")?,
            updated_at: row.try_get("category_updated_at")?,
        }),
        _ => None,
    };

    Ok(Meal {
        id: row.try_get("meal_id")?,
        title: row.try_get("title")?,
        category_id,
        rating: row.try_get("rating")?,
        image_url: row.try_get("image_url")?,
        recipe_text: row.try_get("recipe_text")?,
        created_at: row.try_get("meal_created_at")?,
        updated_at: row.try_get("meal_updated_at")?,
        category,
    })
}

/// Empty and whitespace-only strings are stored as NULL
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_rating(rating: i64) -> Result<()> {
    if !(0..=MAX_RATING).contains(&rating) {
        return Err(Error::InvalidInput(format!(
            "Rating must be between 0 and {}",
            MAX_RATING
        )));
    }
    Ok(())
}

async fn validate_category(pool: &SqlitePool, category_id: Option<i64>) -> Result<()> {
    if let Some(id) = category_id {
        if super::categories::find(pool, id).await?.is_none() {
            return Err(Error::InvalidInput("Invalid categoryId".to_string()));
        }
    }
    Ok(())
}

/// All meals, newest first, optionally restricted to one category
pub async fn list(pool: &SqlitePool, category_id: Option<i64>) -> Result<Vec<Meal>> {
    let sql = format!(
        "SELECT {} FROM meals m {} WHERE (?1 IS NULL OR m.category_id = ?1) \
         ORDER BY m.created_at DESC, m.id DESC",
        MEAL_COLUMNS, CATEGORY_JOIN
    );
    let rows = sqlx::query(&sql).bind(category_id).fetch_all(pool).await?;

    Ok(rows.iter().map(meal_from_row).collect::<sqlx::Result<Vec<_>>>()?)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Meal>> {
    let sql = format!(
        "SELECT {} FROM meals m {} WHERE m.id = ?",
        MEAL_COLUMNS, CATEGORY_JOIN
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    Ok(row.as_ref().map(meal_from_row).transpose()?)
}

/// Insert a meal after validating title, rating and category
pub async fn create(pool: &SqlitePool, meal: NewMeal) -> Result<Meal> {
    let title = meal.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::InvalidInput("Meal title is required".to_string()));
    }
    validate_rating(meal.rating)?;
    validate_category(pool, meal.category_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO meals (title, category_id, rating, image_url, recipe_text)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&title)
    .bind(meal.category_id)
    .bind(meal.rating)
    .bind(non_blank(meal.image_url))
    .bind(non_blank(meal.recipe_text))
    .execute(pool)
    .await?;

    find(pool, result.last_insert_rowid())
        .await?
        .ok_or_else(|| Error::Internal("Inserted meal vanished".to_string()))
}

/// Apply a partial update; `None` when the meal does not exist
pub async fn update(pool: &SqlitePool, id: i64, changes: MealUpdate) -> Result<Option<Meal>> {
    let Some(current) = find(pool, id).await? else {
        return Ok(None);
    };

    let title = match changes.title {
        Some(title) if title.trim().is_empty() => {
            return Err(Error::InvalidInput("Meal title is required".to_string()));
        }
        Some(title) => title.trim().to_string(),
        None => current.title,
    };
    let rating = changes.rating.unwrap_or(current.rating);
    validate_rating(rating)?;
    let category_id = changes.category_id.unwrap_or(current.category_id);
    validate_category(pool, category_id).await?;
    let image_url = changes.image_url.map(non_blank).unwrap_or(current.image_url);
    let recipe_text = changes
        .recipe_text
        .map(non_blank)
        .unwrap_or(current.recipe_text);

    sqlx::query(
        r#"
        UPDATE meals
        SET title = ?, category_id = ?, rating = ?, image_url = ?, recipe_text = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&title)
    .bind(category_id)
    .bind(rating)
    .bind(&image_url)
    .bind(&recipe_text)
    .bind(id)
    .execute(pool)
    .await?;

    find(pool, id).await
}

/// Delete a meal and every planned meal referring to it
///
/// Returns the deleted meal so the caller can clean up its image.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<Option<Meal>> {
    let Some(meal) = find(pool, id).await? else {
        return Ok(None);
    };

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM planned_meals WHERE meal_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM meals WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Some(meal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::categories;
    use crate::db::test_support::test_pool;

    fn new_meal(title: &str) -> NewMeal {
        NewMeal {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_with_category() {
        let (_dir, pool) = test_pool().await;
        let cat = categories::create(&pool, "Main Dishes", Some("#4ECDC4"))
            .await
            .unwrap();

        let meal = create(
            &pool,
            NewMeal {
                title: "  Grilled Chicken ".to_string(),
                category_id: Some(cat.id),
                rating: 5,
                image_url: Some(String::new()),
                recipe_text: Some("Grill it".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(meal.title, "Grilled Chicken");
        assert_eq!(meal.rating, 5);
        assert_eq!(meal.image_url, None);
        assert!(meal.has_recipe());
        let category = meal.category.unwrap();
        assert_eq!(category.name, "Main Dishes");
        assert_eq!(category.color.as_deref(), Some("#4ECDC4"));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (_dir, pool) = test_pool().await;

        assert!(matches!(
            create(&pool, new_meal("   ")).await,
            Err(Error::InvalidInput(_))
        ));

        let mut too_good = new_meal("Cake");
        too_good.rating = 6;
        assert!(matches!(
            create(&pool, too_good).await,
            Err(Error::InvalidInput(_))
        ));

        let mut orphan = new_meal("Cake");
        orphan.category_id = Some(42);
        assert!(matches!(
            create(&pool, orphan).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_filter() {
        let (_dir, pool) = test_pool().await;
        let cat = categories::create(&pool, "Snacks", None).await.unwrap();

        let first = create(&pool, new_meal("First")).await.unwrap();
        let mut snack = new_meal("Trail Mix");
        snack.category_id = Some(cat.id);
        let second = create(&pool, snack).await.unwrap();

        let all = list(&pool, None).await.unwrap();
        assert_eq!(
            all.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let snacks = list(&pool, Some(cat.id)).await.unwrap();
        assert_eq!(snacks.len(), 1);
        assert_eq!(snacks[0].title, "Trail Mix");
    }

    #[tokio::test]
    async fn test_partial_update_and_clear() {
        let (_dir, pool) = test_pool().await;
        let cat = categories::create(&pool, "Desserts", None).await.unwrap();
        let mut cake = new_meal("Cake");
        cake.category_id = Some(cat.id);
        cake.recipe_text = Some("Bake".to_string());
        let meal = create(&pool, cake).await.unwrap();

        let updated = update(
            &pool,
            meal.id,
            MealUpdate {
                rating: Some(4),
                category_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.title, "Cake");
        assert_eq!(updated.rating, 4);
        assert_eq!(updated.category_id, None);
        assert!(updated.category.is_none());
        assert_eq!(updated.recipe_text.as_deref(), Some("Bake"));

        assert!(update(&pool, 999, MealUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_planned_meals() {
        let (_dir, pool) = test_pool().await;
        let meal = create(&pool, new_meal("Soup")).await.unwrap();
        sqlx::query("INSERT INTO weekly_plans (week_start_date) VALUES ('2025-11-24')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO planned_meals (weekly_plan_id, meal_id, day_of_week, slot) VALUES (1, ?, 3, 'DINNER')",
        )
        .bind(meal.id)
        .execute(&pool)
        .await
        .unwrap();

        let deleted = delete(&pool, meal.id).await.unwrap().unwrap();
        assert_eq!(deleted.title, "Soup");
        assert!(find(&pool, meal.id).await.unwrap().is_none());

        let planned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM planned_meals")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(planned, 0);

        assert!(delete(&pool, meal.id).await.unwrap().is_none());
    }
}
