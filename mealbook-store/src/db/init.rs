//! Database initialization
//!
//! Startup sequence, safe to run on every launch:
//! 1. Open (or create) the database file with foreign keys enabled
//! 2. CREATE TABLE IF NOT EXISTS for every table and seed the reserved
//!    category, all in one transaction
//! 3. Add columns missing from tables created by older builds
//! 4. Run pending versioned migrations
//!
//! Any failure along the way is reported as `Error::StorageInit`.

use crate::config::StoreConfig;
use crate::db::migrations::run_migrations;
use crate::db::table_schemas::sync_all_table_schemas;
use crate::vocab::{DEFAULT_CATEGORY_NAME, DEFAULT_DEPARTMENT};
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the database described by `config` and bring its schema up to date
pub async fn init_database(config: &StoreConfig) -> Result<SqlitePool> {
    let db_path = &config.database_path;
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(Error::storage_init)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(Error::storage_init)?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    initialize(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Single connection that never expires, so the data lives exactly as long
/// as the returned pool.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(Error::storage_init)?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(Error::storage_init)?;

    initialize(&pool).await?;
    Ok(pool)
}

/// Create tables, sync columns and run migrations on an open pool
pub async fn initialize(pool: &SqlitePool) -> Result<()> {
    create_tables(pool).await.map_err(Error::storage_init)?;
    sync_all_table_schemas(pool).await.map_err(Error::storage_init)?;
    run_migrations(pool).await.map_err(Error::storage_init)?;

    info!("Database schema ready");
    Ok(())
}

async fn create_tables(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    create_schema_version_table(&mut tx).await?;
    create_recipes_table(&mut tx).await?;
    create_categories_table(&mut tx).await?;
    create_recipe_categories_table(&mut tx).await?;
    create_shopping_list_table(&mut tx).await?;
    create_meal_plan_table(&mut tx).await?;
    seed_default_category(&mut tx).await?;

    tx.commit().await?;
    Ok(())
}

async fn create_schema_version_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_recipes_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            ingredients TEXT NOT NULL,
            instructions TEXT NOT NULL,
            image TEXT,
            totalTime TEXT
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_categories_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL UNIQUE,
            image TEXT
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_recipe_categories_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipe_categories (
            recipeId INTEGER NOT NULL,
            categoryId INTEGER NOT NULL,
            PRIMARY KEY (recipeId, categoryId),
            FOREIGN KEY (recipeId) REFERENCES recipes(id) ON DELETE CASCADE,
            FOREIGN KEY (categoryId) REFERENCES categories(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_shopping_list_table(conn: &mut SqliteConnection) -> Result<()> {
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS shopping_list (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            department TEXT DEFAULT '{}',
            checked INTEGER NOT NULL DEFAULT 0
        )
        "#,
        DEFAULT_DEPARTMENT
    );
    sqlx::query(&sql).execute(&mut *conn).await?;

    Ok(())
}

async fn create_meal_plan_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meal_plan (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            day TEXT NOT NULL,
            meal_type TEXT NOT NULL,
            recipe_id INTEGER NOT NULL,
            UNIQUE (day, meal_type),
            FOREIGN KEY (recipe_id) REFERENCES recipes (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert the reserved favorites category unless a category with that name exists
async fn seed_default_category(conn: &mut SqliteConnection) -> Result<()> {
    let result = sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES (?)")
        .bind(DEFAULT_CATEGORY_NAME)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() > 0 {
        info!("Seeded default category '{}'", DEFAULT_CATEGORY_NAME);
    }

    Ok(())
}
