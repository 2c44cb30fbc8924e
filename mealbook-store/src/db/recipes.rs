//! Recipe repository
//!
//! CRUD for recipes and their category links. Multi-statement writes
//! (recipe + links, recipe delete + meal plan cleanup) run in a single
//! transaction: a failure part way leaves the store as it was.

use crate::db::models::{
    decode_ingredients, decode_instructions, encode_ingredients, encode_instructions, NewRecipe,
    Recipe, RecipeWithCategories,
};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

const RECIPE_COLUMNS: &str = "r.id, r.title, r.ingredients, r.instructions, r.image, r.totalTime";

/// Recipe and recipe-category link queries
#[derive(Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a recipe and link it to `category_ids`, returning the new recipe id
    ///
    /// Any failing link (e.g. unknown category) rolls back the recipe row too.
    pub async fn insert_recipe_with_categories(
        &self,
        recipe: &NewRecipe,
        category_ids: &[i64],
    ) -> Result<i64> {
        recipe.validate()?;
        let ingredients = encode_ingredients(&recipe.ingredients)?;
        let instructions = encode_instructions(&recipe.instructions)?;
        let category_ids = dedup_ids(category_ids);

        let mut tx = self.pool.begin().await?;

        let recipe_id = sqlx::query(
            r#"
            INSERT INTO recipes (title, ingredients, instructions, image, totalTime)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(recipe.title.trim())
        .bind(&ingredients)
        .bind(&instructions)
        .bind(&recipe.image)
        .bind(&recipe.total_time)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        insert_links(&mut tx, recipe_id, &category_ids).await?;

        tx.commit().await?;

        info!(
            "Recipe {} '{}' inserted with {} categories",
            recipe_id,
            recipe.title.trim(),
            category_ids.len()
        );
        Ok(recipe_id)
    }

    /// Replace every field of recipe `id` and its full set of category links
    ///
    /// Fails with `NotFound` when no recipe has this id. An empty
    /// `category_ids` leaves the recipe with no categories.
    pub async fn update_recipe_with_categories(
        &self,
        id: i64,
        recipe: &NewRecipe,
        category_ids: &[i64],
    ) -> Result<()> {
        recipe.validate()?;
        let ingredients = encode_ingredients(&recipe.ingredients)?;
        let instructions = encode_instructions(&recipe.instructions)?;
        let category_ids = dedup_ids(category_ids);

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE recipes
            SET title = ?, ingredients = ?, instructions = ?, image = ?, totalTime = ?
            WHERE id = ?
            "#,
        )
        .bind(recipe.title.trim())
        .bind(&ingredients)
        .bind(&instructions)
        .bind(&recipe.image)
        .bind(&recipe.total_time)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(Error::NotFound(format!("recipe {}", id)));
        }

        sqlx::query("DELETE FROM recipe_categories WHERE recipeId = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_links(&mut tx, id, &category_ids).await?;

        tx.commit().await?;

        info!("Recipe {} updated with {} categories", id, category_ids.len());
        Ok(())
    }

    /// Recipe with its comma-joined category names, `None` for an unknown id
    pub async fn fetch_recipe_by_id(&self, id: i64) -> Result<Option<RecipeWithCategories>> {
        let sql = format!(
            r#"
            SELECT {}, GROUP_CONCAT(c.name) AS categoryNames
            FROM recipes r
            LEFT JOIN recipe_categories rc ON r.id = rc.recipeId
            LEFT JOIN categories c ON rc.categoryId = c.id
            WHERE r.id = ?
            GROUP BY r.id
            "#,
            RECIPE_COLUMNS
        );

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(recipe_with_categories_from_row).transpose()
    }

    /// Every recipe, by ascending id
    pub async fn fetch_all_recipes(&self) -> Result<Vec<Recipe>> {
        let sql = format!("SELECT {} FROM recipes r ORDER BY r.id", RECIPE_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(recipe_from_row).collect()
    }

    /// Every recipe with its category names, by ascending id
    pub async fn fetch_all_recipes_with_categories(&self) -> Result<Vec<RecipeWithCategories>> {
        let sql = format!(
            r#"
            SELECT {}, GROUP_CONCAT(c.name) AS categoryNames
            FROM recipes r
            LEFT JOIN recipe_categories rc ON r.id = rc.recipeId
            LEFT JOIN categories c ON rc.categoryId = c.id
            GROUP BY r.id
            ORDER BY r.id
            "#,
            RECIPE_COLUMNS
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(recipe_with_categories_from_row).collect()
    }

    /// Delete a recipe; its category links go with it (foreign key cascade)
    ///
    /// Meal plan slots holding the recipe are cleared in the same
    /// transaction. Returns false when no recipe had this id.
    pub async fn delete_recipe_by_id(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let cleared_slots = sqlx::query("DELETE FROM meal_plan WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            debug!("Delete of unknown recipe {} ignored", id);
            return Ok(false);
        }

        tx.commit().await?;

        info!("Recipe {} deleted ({} meal plan slots cleared)", id, cleared_slots);
        Ok(true)
    }

    /// Recipes linked to a category, by ascending id
    pub async fn fetch_recipes_by_category(&self, category_id: i64) -> Result<Vec<Recipe>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM recipes r
            JOIN recipe_categories rc ON r.id = rc.recipeId
            WHERE rc.categoryId = ?
            ORDER BY r.id
            "#,
            RECIPE_COLUMNS
        );

        let rows = sqlx::query(&sql).bind(category_id).fetch_all(&self.pool).await?;
        rows.iter().map(recipe_from_row).collect()
    }

    /// Remove one recipe-category link; the recipe and category stay
    pub async fn delete_recipe_from_category(
        &self,
        recipe_id: i64,
        category_id: i64,
    ) -> Result<bool> {
        let deleted =
            sqlx::query("DELETE FROM recipe_categories WHERE recipeId = ? AND categoryId = ?")
                .bind(recipe_id)
                .bind(category_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if deleted > 0 {
            info!("Recipe {} removed from category {}", recipe_id, category_id);
        }
        Ok(deleted > 0)
    }

    /// Link a recipe to a category; false when the link already existed
    pub async fn add_recipe_to_category(&self, category_id: i64, recipe_id: i64) -> Result<bool> {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO recipe_categories (recipeId, categoryId) VALUES (?, ?)",
        )
        .bind(recipe_id)
        .bind(category_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            debug!("Recipe {} already linked to category {}", recipe_id, category_id);
        } else {
            info!("Recipe {} added to category {}", recipe_id, category_id);
        }
        Ok(inserted > 0)
    }
}

/// Parse category ids as they arrive from form state (strings)
pub fn parse_category_ids<S: AsRef<str>>(ids: &[S]) -> Result<Vec<i64>> {
    ids.iter()
        .map(|id| {
            let id = id.as_ref().trim();
            id.parse::<i64>()
                .map_err(|_| Error::InvalidInput(format!("category id '{}' is not a number", id)))
        })
        .collect()
}

/// Drop repeated ids, keeping first occurrence order
fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if unique.contains(id) {
            warn!("Category id {} listed twice, linking once", id);
        } else {
            unique.push(*id);
        }
    }
    unique
}

async fn insert_links(
    conn: &mut SqliteConnection,
    recipe_id: i64,
    category_ids: &[i64],
) -> Result<()> {
    for category_id in category_ids {
        sqlx::query("INSERT INTO recipe_categories (recipeId, categoryId) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(category_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

fn recipe_from_row(row: &SqliteRow) -> Result<Recipe> {
    let id: i64 = row.try_get("id")?;
    let ingredients: String = row.try_get("ingredients")?;
    let instructions: String = row.try_get("instructions")?;

    let ingredients = decode_ingredients(&ingredients).map_err(|e| {
        warn!("Recipe {} has unreadable ingredients: {}", id, e);
        e
    })?;
    let instructions = decode_instructions(&instructions).map_err(|e| {
        warn!("Recipe {} has unreadable instructions: {}", id, e);
        e
    })?;

    Ok(Recipe {
        id,
        title: row.try_get("title")?,
        ingredients,
        instructions,
        image: row.try_get("image")?,
        total_time: row.try_get("totalTime")?,
    })
}

fn recipe_with_categories_from_row(row: &SqliteRow) -> Result<RecipeWithCategories> {
    Ok(RecipeWithCategories {
        recipe: recipe_from_row(row)?,
        category_names: row.try_get("categoryNames")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_ids() {
        assert_eq!(parse_category_ids(&["1", " 7 "]).unwrap(), vec![1, 7]);
        assert!(parse_category_ids::<&str>(&[]).unwrap().is_empty());
        assert!(matches!(parse_category_ids(&["1", "x"]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_dedup_ids_keeps_first_order() {
        assert_eq!(dedup_ids(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
