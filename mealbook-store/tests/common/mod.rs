//! Shared fixtures for integration tests

#![allow(dead_code)]

use mealbook_store::db::{Ingredient, Instructions, NewRecipe};
use mealbook_store::RecipeStore;

pub fn init() {
    mealbook_store::logging::init_test_logging();
}

pub async fn memory_store() -> RecipeStore {
    init();
    RecipeStore::open_in_memory().await.unwrap()
}

pub fn ingredient(name: &str, quantity: &str, unit: &str) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        quantity: quantity.to_string(),
        unit: unit.to_string(),
        department: None,
    }
}

pub fn recipe(title: &str, ingredients: Vec<Ingredient>) -> NewRecipe {
    NewRecipe {
        title: title.to_string(),
        ingredients,
        instructions: Instructions::from_user_text("לערבב\nלאפות"),
        image: None,
        total_time: Some("30 דקות".to_string()),
    }
}

pub fn pancakes() -> NewRecipe {
    recipe(
        "פנקייק",
        vec![
            ingredient("קמח", "2", "כוסות"),
            ingredient("ביצים", "2", "יחידות"),
            ingredient("חלב", "250", "מ\"ל"),
        ],
    )
}

pub fn omelette() -> NewRecipe {
    recipe(
        "חביתה",
        vec![ingredient("ביצים", "3", "יחידות"), ingredient("מלח", "1", "קורט")],
    )
}

pub async fn count(store: &RecipeStore, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(store.pool())
        .await
        .unwrap()
}
