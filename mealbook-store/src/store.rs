//! Store handle
//!
//! One `RecipeStore` per process, opened once at startup and shared by
//! cloning. All repositories borrow the same connection pool.

use crate::config::StoreConfig;
use crate::db::{
    init_database, init_memory_database, CategoryRepository, MealPlanRepository, RecipeRepository,
    ShoppingListRepository,
};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

#[derive(Clone)]
pub struct RecipeStore {
    pool: SqlitePool,
}

impl RecipeStore {
    /// Open the database file from `config`, creating and migrating it as needed
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let pool = init_database(config).await?;
        Ok(Self { pool })
    }

    /// Fresh in-memory store, gone when the last clone is dropped
    pub async fn open_in_memory() -> Result<Self> {
        let pool = init_memory_database().await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn recipes(&self) -> RecipeRepository {
        RecipeRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn meal_plan(&self) -> MealPlanRepository {
        MealPlanRepository::new(self.pool.clone())
    }

    pub fn shopping_list(&self) -> ShoppingListRepository {
        ShoppingListRepository::new(self.pool.clone())
    }

    /// Wait for in-flight queries and close every connection
    pub async fn close(self) {
        self.pool.close().await;
        info!("Recipe store closed");
    }
}
