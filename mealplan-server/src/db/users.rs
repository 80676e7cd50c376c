//! User accounts

use mealplan_common::db::User;
use mealplan_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::is_unique_violation;

fn user_from_row(row: &SqliteRow) -> sqlx::Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Look up a user by login name
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(user_from_row).transpose()?)
}

/// Look up a user by id
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, username, password_hash, created_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(user_from_row).transpose()?)
}

/// Create a user from an already hashed password
///
/// Returns `Error::Conflict` when the username is taken.
pub async fn create_user(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<User> {
    let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .await;

    match result {
        Ok(done) => find_by_id(pool, done.last_insert_rowid())
            .await?
            .ok_or_else(|| Error::Internal("Inserted user vanished".to_string())),
        Err(e) if is_unique_violation(&e) => Err(Error::Conflict(format!(
            "User '{}' already exists",
            username
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Replace a user's password hash; false when the user does not exist
pub async fn update_password_hash(pool: &SqlitePool, id: i64, password_hash: &str) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET password_hash = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
    )
    .bind(password_hash)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
