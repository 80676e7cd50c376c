//! Database access layer for mealplan-server
//!
//! One module per entity. Every operation returns `mealplan_common::Result`;
//! schema creation lives in `mealplan_common::db`.

pub mod categories;
pub mod dashboard;
pub mod meals;
pub mod planned_meals;
pub mod users;
pub mod weekly_plans;

/// Whether a database error is a UNIQUE constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

/// Wrap a domain error so it can surface from a row-mapping closure
pub(crate) fn decode_error(err: mealplan_common::Error) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

#[cfg(test)]
pub(crate) mod test_support {
    use mealplan_common::db::init::init_database;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Fresh database in a temporary directory; keep the TempDir alive
    pub async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("mealplan.db")).await.unwrap();
        (dir, pool)
    }
}
