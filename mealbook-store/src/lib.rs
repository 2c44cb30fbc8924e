//! # Mealbook Store
//!
//! Local data layer for the Mealbook recipe app:
//! - SQLite schema creation, column sync and migrations
//! - Recipe, category, meal plan and shopping list repositories
//! - Shopping list aggregation
//! - Unit conversion (scaling, metric rollover, plural labels)

pub mod config;
pub mod conversion;
pub mod db;
pub mod error;
pub mod logging;
pub mod shopping;
pub mod store;
pub mod vocab;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::RecipeStore;
