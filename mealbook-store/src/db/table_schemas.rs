//! Table schema definitions
//!
//! Declared columns for the tables whose shape changed across app versions.
//! `recipe_categories` is absent: its composite key cannot be altered in
//! place, so it is only ever created whole.

use crate::db::schema_sync::{sync_table, ColumnDefinition, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

pub struct RecipesTableSchema;

impl TableSchema for RecipesTableSchema {
    fn table_name() -> &'static str {
        "recipes"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("title", "TEXT").not_null(),
            ColumnDefinition::new("ingredients", "TEXT").not_null(),
            ColumnDefinition::new("instructions", "TEXT").not_null(),
            ColumnDefinition::new("image", "TEXT"),
            ColumnDefinition::new("totalTime", "TEXT"),
        ]
    }
}

pub struct CategoriesTableSchema;

impl TableSchema for CategoriesTableSchema {
    fn table_name() -> &'static str {
        "categories"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null(),
            ColumnDefinition::new("image", "TEXT"),
        ]
    }
}

pub struct ShoppingListTableSchema;

impl TableSchema for ShoppingListTableSchema {
    fn table_name() -> &'static str {
        "shopping_list"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null(),
            ColumnDefinition::new("quantity", "REAL").not_null(),
            ColumnDefinition::new("unit", "TEXT").not_null(),
            ColumnDefinition::new("department", "TEXT").default("'אחר'"),
            // User toggled "already bought" flag; missing before shopping list persistence kept it
            ColumnDefinition::new("checked", "INTEGER").not_null().default("0"),
        ]
    }
}

pub struct MealPlanTableSchema;

impl TableSchema for MealPlanTableSchema {
    fn table_name() -> &'static str {
        "meal_plan"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("day", "TEXT").not_null(),
            ColumnDefinition::new("meal_type", "TEXT").not_null(),
            ColumnDefinition::new("recipe_id", "INTEGER").not_null(),
        ]
    }
}

/// Add missing columns to every declared table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    let added = sync_table::<RecipesTableSchema>(pool).await?
        + sync_table::<CategoriesTableSchema>(pool).await?
        + sync_table::<ShoppingListTableSchema>(pool).await?
        + sync_table::<MealPlanTableSchema>(pool).await?;

    if added > 0 {
        info!("Schema sync added {} column(s)", added);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_sync::introspect_table;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_legacy_shopping_list_gains_checked_column() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query(
            "CREATE TABLE shopping_list (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, \
             quantity REAL NOT NULL, unit TEXT NOT NULL, department TEXT DEFAULT 'אחר')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sync_all_table_schemas(&pool).await.unwrap();

        let columns = introspect_table(&pool, "shopping_list").await.unwrap();
        let checked = columns.iter().find(|c| c.name == "checked").expect("checked column added");
        assert!(checked.not_null);
    }

    #[test]
    fn test_declared_columns_include_key_fields() {
        let recipes = RecipesTableSchema::expected_columns();
        assert!(recipes.iter().any(|c| c.name == "id" && c.primary_key));
        assert!(recipes.iter().any(|c| c.name == "totalTime"));

        let shopping = ShoppingListTableSchema::expected_columns();
        assert!(shopping
            .iter()
            .any(|c| c.name == "checked" && c.default_value.as_deref() == Some("0")));
    }
}
