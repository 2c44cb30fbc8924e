//! Database schema migrations
//!
//! Versioned data migrations tracked in `schema_version`. Each migration and
//! its version bump commit in one transaction, and every migration is
//! idempotent so a crash between steps never leaves a half-applied change.
//!
//! # Migration Guidelines
//!
//! 1. Never modify an existing migration; add a new one
//! 2. Migrations must be safe on both fresh and legacy databases
//! 3. Plain column additions belong in `table_schemas`, not here

use crate::db::models::unwrap_double_encoded;
use crate::Result;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

/// Current schema version
///
/// Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Latest applied version, 0 on a database that never ran migrations
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i64> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(conn: &mut SqliteConnection, version: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(&mut *conn)
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
            "Database schema version ({}) is newer than code version ({}); \
             proceeding without migrations",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        let mut tx = pool.begin().await?;
        migrate_v1(&mut tx).await?;
        set_schema_version(&mut tx, 1).await?;
        tx.commit().await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        let mut tx = pool.begin().await?;
        migrate_v2(&mut tx).await?;
        set_schema_version(&mut tx, 2).await?;
        tx.commit().await?;
        info!("Migration v2 completed");
    }

    Ok(())
}

/// Migration v1: one recipe per meal plan slot
///
/// Older databases created `meal_plan` without a uniqueness rule on
/// (day, meal_type) and appended a row per assignment. Keep the newest row
/// of each slot and add the unique index the upsert relies on.
async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
    info!("Running migration v1: unique meal plan slots");

    let removed = sqlx::query(
        r#"
        DELETE FROM meal_plan
        WHERE id NOT IN (
            SELECT MAX(id) FROM meal_plan GROUP BY day, meal_type
        )
        "#,
    )
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if removed > 0 {
        info!("  Removed {} superseded meal plan rows", removed);
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_meal_plan_slot ON meal_plan (day, meal_type)",
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Migration v2: single-encode recipe ingredients
///
/// Older builds stringified ingredient lists that were already JSON text,
/// storing a JSON string that contains the JSON array. Rewrite such rows to
/// plain JSON so every reader sees one shape. Instructions are left alone: a
/// JSON string there is free text.
async fn migrate_v2(conn: &mut SqliteConnection) -> Result<()> {
    info!("Running migration v2: unwrap double-encoded ingredients");

    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, ingredients FROM recipes")
        .fetch_all(&mut *conn)
        .await?;

    let mut fixed = 0;
    for (id, ingredients) in rows {
        let Some(unwrapped) = unwrap_double_encoded(&ingredients) else {
            continue;
        };

        sqlx::query("UPDATE recipes SET ingredients = ? WHERE id = ?")
            .bind(unwrapped)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        fixed += 1;
    }

    if fixed > 0 {
        info!("  Rewrote {} recipe rows", fixed);
    }

    Ok(())
}
