//! Database schema migrations
//!
//! Versioned migrations tracked in the `schema_version` table. Every migration
//! is idempotent (safe to run multiple times).
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field have already run them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use ALTER TABLE / CREATE INDEX IF NOT EXISTS** - preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: lookup indexes for the planner and the meal list
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: planner and meal list indexes");

    let statements = [
        "CREATE INDEX IF NOT EXISTS idx_planned_meals_plan_day \
         ON planned_meals (weekly_plan_id, day_of_week, slot, position)",
        "CREATE INDEX IF NOT EXISTS idx_planned_meals_meal ON planned_meals (meal_id)",
        "CREATE INDEX IF NOT EXISTS idx_meals_category ON meals (category_id)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

/// Migration v2: normalize week start dates to `YYYY-MM-DD`
///
/// Plan lookups compare the plain date, so a `week_start_date` carrying a time
/// part (`2025-01-06T00:00:00.000Z`) would never match. Such values are cut to
/// the date. When several rows share a date, only the oldest is cut and only
/// if no plain-date row exists, so the UNIQUE constraint cannot fail.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: normalize weekly plan dates");

    let result = sqlx::query(
        r#"
        UPDATE weekly_plans
        SET week_start_date = substr(week_start_date, 1, 10)
        WHERE length(week_start_date) > 10
          AND NOT EXISTS (
              SELECT 1 FROM weekly_plans other
              WHERE other.week_start_date = substr(weekly_plans.week_start_date, 1, 10)
          )
          AND id = (
              SELECT MIN(dup.id) FROM weekly_plans dup
              WHERE substr(dup.week_start_date, 1, 10) = substr(weekly_plans.week_start_date, 1, 10)
          )
        "#,
    )
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!(
            "  ✓ Normalized {} weekly plan date(s)",
            result.rows_affected()
        );
    }

    Ok(())
}
