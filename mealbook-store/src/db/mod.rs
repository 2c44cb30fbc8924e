//! Database schema, models and repositories

pub mod categories;
pub mod init;
pub mod meal_plan;
pub mod migrations;
pub mod models;
pub mod recipes;
pub mod schema_sync;
pub mod shopping_list;
pub mod table_schemas;

pub use categories::CategoryRepository;
pub use init::*;
pub use meal_plan::{MealPlan, MealPlanRepository};
pub use models::*;
pub use recipes::{parse_category_ids, RecipeRepository};
pub use shopping_list::ShoppingListRepository;
