//! Database initialization: first run, reopen, and upgrade of older files

mod common;

use mealbook_store::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use mealbook_store::db::Instructions;
use mealbook_store::vocab::{MealSlot, Weekday, DEFAULT_CATEGORY_NAME};
use mealbook_store::{RecipeStore, StoreConfig};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tempfile::TempDir;

async fn default_category_count(store: &RecipeStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE name = ?")
        .bind(DEFAULT_CATEGORY_NAME)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_database_created_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("recipes.db");

    let store = RecipeStore::open(&StoreConfig::at_path(&db_path)).await;
    assert!(store.is_ok(), "Database initialization failed: {:?}", store.err());
    assert!(db_path.exists(), "Database file was not created");

    let store = store.unwrap();
    for table in ["recipes", "recipe_categories", "shopping_list", "meal_plan"] {
        assert_eq!(common::count(&store, table).await, 0, "{} should start empty", table);
    }
    assert_eq!(default_category_count(&store).await, 1);
    assert_eq!(get_schema_version(store.pool()).await.unwrap(), CURRENT_SCHEMA_VERSION);
    store.close().await;
}

#[tokio::test]
async fn test_reopen_keeps_data_and_single_default_category() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::at_path(dir.path().join("recipes.db"));

    let store = RecipeStore::open(&config).await.unwrap();
    let recipe_id = store
        .recipes()
        .insert_recipe_with_categories(&common::pancakes(), &[])
        .await
        .unwrap();
    store.close().await;

    let reopened = RecipeStore::open(&config).await.unwrap();
    assert_eq!(default_category_count(&reopened).await, 1);
    let found = reopened.recipes().fetch_recipe_by_id(recipe_id).await.unwrap();
    assert_eq!(found.map(|r| r.recipe.title), Some("פנקייק".to_string()));
    reopened.close().await;
}

#[tokio::test]
async fn test_initialization_is_idempotent_on_memory_pool() {
    let store = common::memory_store().await;
    mealbook_store::db::initialize(store.pool()).await.unwrap();
    mealbook_store::db::initialize(store.pool()).await.unwrap();
    assert_eq!(default_category_count(&store).await, 1);
}

#[tokio::test]
async fn test_invalid_config_rejected_before_open() {
    let mut config = StoreConfig::at_path("unused.db");
    config.max_connections = 0;
    assert!(matches!(
        RecipeStore::open(&config).await,
        Err(mealbook_store::Error::Config(_))
    ));
}

#[tokio::test]
async fn test_unwritable_location_is_storage_init_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let result = RecipeStore::open(&StoreConfig::at_path(blocker.join("recipes.db"))).await;
    assert!(matches!(result, Err(mealbook_store::Error::StorageInit(_))));
}

/// A file written by an older build: no `checked` column, several rows per
/// meal plan slot, ingredients stored as a JSON string of JSON.
#[tokio::test]
async fn test_legacy_database_upgraded() {
    common::init();
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("legacy.db");

    let mut conn = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();

    let rice = r#"[{"name":"אורז","quantity":"1","unit":"כוס"}]"#;
    let legacy_ingredients = serde_json::to_string(rice).unwrap();
    let quoted_instructions = serde_json::to_string("[1, 2]").unwrap();
    let day = Weekday::Sunday.label();
    let lunch = MealSlot::Lunch.label();

    for sql in [
        r#"
        CREATE TABLE recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            ingredients TEXT NOT NULL,
            instructions TEXT NOT NULL,
            image TEXT,
            totalTime TEXT
        )
        "#,
        r#"
        CREATE TABLE shopping_list (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            department TEXT DEFAULT 'אחר'
        )
        "#,
        r#"
        CREATE TABLE meal_plan (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            day TEXT NOT NULL,
            meal_type TEXT NOT NULL,
            recipe_id INTEGER NOT NULL
        )
        "#,
    ] {
        sqlx::query(sql).execute(&mut conn).await.unwrap();
    }
    sqlx::query("INSERT INTO recipes (title, ingredients, instructions) VALUES ('אורז', ?, 'לבשל')")
        .bind(&legacy_ingredients)
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO recipes (title, ingredients, instructions) VALUES ('סלט', '[]', ?)")
        .bind(&quoted_instructions)
        .execute(&mut conn)
        .await
        .unwrap();
    for recipe_id in [1, 2] {
        sqlx::query("INSERT INTO meal_plan (day, meal_type, recipe_id) VALUES (?, ?, ?)")
            .bind(day)
            .bind(lunch)
            .bind(recipe_id)
            .execute(&mut conn)
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO shopping_list (name, quantity, unit) VALUES ('אורז', 1, 'כוס')")
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();

    let store = RecipeStore::open(&StoreConfig::at_path(&db_path)).await.unwrap();

    // Newest assignment of the slot wins
    let plan = store.meal_plan().fetch_meal_plan().await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].recipe_id, 2);

    // Upsert works once the slot index exists
    store.meal_plan().insert_meal_plan(day, lunch, 1).await.unwrap();
    assert_eq!(store.meal_plan().fetch_meal_plan().await.unwrap()[0].recipe_id, 1);

    let stored: String = sqlx::query_scalar("SELECT ingredients FROM recipes WHERE id = 1")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert!(stored.starts_with('['), "ingredients still double-encoded: {}", stored);

    let rice = store.recipes().fetch_recipe_by_id(1).await.unwrap().unwrap();
    assert_eq!(rice.recipe.ingredients, vec![common::ingredient("אורז", "1", "כוס")]);

    // Instructions stored as a JSON string are free text and stay as written
    let stored: String = sqlx::query_scalar("SELECT instructions FROM recipes WHERE id = 2")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(stored, quoted_instructions);
    let salad = store.recipes().fetch_recipe_by_id(2).await.unwrap().unwrap();
    assert_eq!(salad.recipe.instructions, Instructions::Text("[1, 2]".to_string()));

    let list = store.shopping_list().fetch_shopping_list().await.unwrap();
    assert_eq!(list.len(), 1);
    assert!(!list[0].checked);

    assert_eq!(default_category_count(&store).await, 1);
    assert_eq!(get_schema_version(store.pool()).await.unwrap(), CURRENT_SCHEMA_VERSION);
    store.close().await;
}
