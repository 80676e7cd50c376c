//! Meal categories

use mealplan_common::db::Category;
use mealplan_common::{Error, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::is_unique_violation;

/// Category with the number of meals filed under it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub meal_count: i64,
}

/// Partial category update
///
/// `color: Some(None)` clears the color; an empty name is ignored.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub color: Option<Option<String>>,
}

pub(crate) fn category_from_row(row: &SqliteRow) -> sqlx::Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        color: row.try_get("color")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn duplicate_name(name: &str) -> Error {
    Error::Conflict(format!("Category '{}' already exists", name))
}

/// All categories ordered by name, with meal counts
pub async fn list_with_counts(pool: &SqlitePool) -> Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.name, c.color, c.created_at, c.updated_at,
               COUNT(m.id) AS meal_count
        FROM categories c
        LEFT JOIN meals m ON m.category_id = c.id
        GROUP BY c.id
        ORDER BY c.name COLLATE NOCASE, c.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut categories = Vec::with_capacity(rows.len());
    for row in &rows {
        categories.push(CategoryWithCount {
            category: category_from_row(row)?,
            meal_count: row.try_get("meal_count")?,
        });
    }
    Ok(categories)
}

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, name, color, created_at, updated_at FROM categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(category_from_row).transpose()?)
}

/// Create a category; `Error::Conflict` when the name is taken
pub async fn create(pool: &SqlitePool, name: &str, color: Option<&str>) -> Result<Category> {
    let result = sqlx::query("INSERT INTO categories (name, color) VALUES (?, ?)")
        .bind(name)
        .bind(color)
        .execute(pool)
        .await;

    match result {
        Ok(done) => find(pool, done.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::Internal("Inserted category vanished".to_string())),
        Err(e) if is_unique_violation(&e) => Err(duplicate_name(name)),
        Err(e) => Err(e.into()),
    }
}

/// Apply a partial update; `None` when the category does not exist
pub async fn update(pool: &SqlitePool, id: i64, changes: &CategoryUpdate) -> Result<Option<Category>> {
    let Some(current) = find(pool, id).await? else {
        return Ok(None);
    };

    let name = changes
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&current.name)
        .to_string();
    let color = match &changes.color {
        Some(color) => color.clone(),
        None => current.color.clone(),
    };

    let result = sqlx::query(
        "UPDATE categories SET name = ?, color = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(&name)
    .bind(&color)
    .bind(id)
    .execute(pool)
    .await;

    match result {
        Ok(_) => find(pool, id).await,
        Err(e) if is_unique_violation(&e) => Err(duplicate_name(&name)),
        Err(e) => Err(e.into()),
    }
}

/// Delete a category, leaving its meals uncategorized
///
/// Returns false when the category does not exist.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE meals SET category_id = NULL, updated_at = CURRENT_TIMESTAMP WHERE category_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}
