//! Shopping list repository
//!
//! The persisted list is the working copy of aggregated ingredients plus the
//! user's `checked` flags. Saves replace the whole list in one transaction.

use crate::db::meal_plan::MealPlanRepository;
use crate::db::models::ShoppingListItem;
use crate::db::recipes::RecipeRepository;
use crate::shopping::{combine_ingredients, merge_into_list, AggregatedIngredient};
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

#[derive(Clone)]
pub struct ShoppingListRepository {
    pool: SqlitePool,
}

impl ShoppingListRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Current list in row order
    pub async fn fetch_shopping_list(&self) -> Result<Vec<ShoppingListItem>> {
        let rows = sqlx::query(
            "SELECT id, name, quantity, unit, department, checked FROM shopping_list ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ShoppingListItem> {
                Ok(ShoppingListItem {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    unit: row.try_get("unit")?,
                    quantity: row.try_get("quantity")?,
                    department: row.try_get("department")?,
                    checked: row.try_get("checked")?,
                })
            })
            .collect()
    }

    /// Replace the stored list with `items`
    ///
    /// Every item is validated first; an invalid one rejects the whole save
    /// and the previous list stays.
    pub async fn save_shopping_list(&self, items: &[ShoppingListItem]) -> Result<()> {
        for item in items {
            validate_item(item)?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM shopping_list").execute(&mut *tx).await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO shopping_list (id, name, quantity, unit, department, checked)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(&item.department)
            .bind(item.checked)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!("Shopping list saved ({} items)", items.len());
        Ok(())
    }

    /// Remove every item, returning how many were removed
    pub async fn clear_shopping_list(&self) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM shopping_list")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!("Shopping list cleared ({} items)", deleted);
        Ok(deleted)
    }

    /// Remove the items with these ids
    pub async fn delete_shopping_list_items(&self, ids: &[i64]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;

        for id in ids {
            deleted += sqlx::query("DELETE FROM shopping_list WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;

        info!("Removed {} shopping list items", deleted);
        Ok(deleted)
    }

    /// Persist one item's checked flag; false when no item has this id
    pub async fn set_item_checked(&self, id: i64, checked: bool) -> Result<bool> {
        let updated = sqlx::query("UPDATE shopping_list SET checked = ? WHERE id = ?")
            .bind(checked)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(updated > 0)
    }

    /// Merge the ingredients of these recipes into the stored list and return the result
    ///
    /// Unknown recipe ids are logged and skipped. Lines already on the list
    /// keep their checked flag.
    pub async fn add_recipes(&self, recipe_ids: &[i64]) -> Result<Vec<ShoppingListItem>> {
        let aggregated = self.aggregate_recipes(recipe_ids).await?;
        let merged = merge_into_list(self.fetch_shopping_list().await?, &aggregated);
        self.save_shopping_list(&merged).await?;

        info!(
            "Added {} recipes to shopping list ({} lines)",
            recipe_ids.len(),
            merged.len()
        );
        self.fetch_shopping_list().await
    }

    /// Replace the list with the ingredients of every recipe in the meal plan
    ///
    /// With an empty meal plan the current list is left alone. All recipes
    /// are read before the list is touched, so a recipe that fails to load
    /// leaves the old list in place.
    pub async fn rebuild_from_meal_plan(&self) -> Result<Vec<ShoppingListItem>> {
        let plan = MealPlanRepository::new(self.pool.clone()).fetch_plan().await?;
        let recipe_ids = plan.recipe_ids();

        if recipe_ids.is_empty() {
            info!("Meal plan is empty; shopping list unchanged");
            return self.fetch_shopping_list().await;
        }

        let aggregated = self.aggregate_recipes(&recipe_ids).await?;
        let rebuilt = merge_into_list(Vec::new(), &aggregated);
        self.save_shopping_list(&rebuilt).await?;

        info!(
            "Shopping list rebuilt from {} planned recipes ({} lines)",
            recipe_ids.len(),
            rebuilt.len()
        );
        self.fetch_shopping_list().await
    }

    async fn aggregate_recipes(&self, recipe_ids: &[i64]) -> Result<Vec<AggregatedIngredient>> {
        let recipes = RecipeRepository::new(self.pool.clone());

        let mut ingredients = Vec::new();
        for &recipe_id in recipe_ids {
            match recipes.fetch_recipe_by_id(recipe_id).await? {
                Some(found) => ingredients.extend(found.recipe.ingredients),
                None => warn!("No recipe with id {} for shopping list, skipping", recipe_id),
            }
        }

        Ok(combine_ingredients(&ingredients))
    }
}

fn validate_item(item: &ShoppingListItem) -> Result<()> {
    if item.name.trim().is_empty() {
        return Err(Error::InvalidInput("shopping list item has no name".to_string()));
    }
    if !item.quantity.is_finite() {
        return Err(Error::InvalidInput(format!(
            "shopping list item '{}' has invalid quantity {}",
            item.name, item.quantity
        )));
    }
    Ok(())
}
