//! Shopping list aggregation
//!
//! Merges ingredient lists from several recipes into one deduplicated list.
//! Grouping is by exact `name-unit` key: units are not normalized here, so
//! "כוס" and "כוסות" of the same ingredient stay on separate lines unless
//! the caller normalized them first (see [`crate::conversion`]).

use crate::conversion::parse_quantity;
use crate::db::models::{Ingredient, ShoppingListItem};
use crate::vocab::DEFAULT_DEPARTMENT;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// One summed line produced by [`combine_ingredients`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedIngredient {
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub department: Option<String>,
}

/// Grouping key for an ingredient or shopping list line
pub fn item_key(name: &str, unit: &str) -> String {
    format!("{}-{}", name, unit)
}

/// Sum ingredients sharing a name and unit
///
/// Entries with a blank name, a blank unit, or a quantity that is zero or not
/// a number are logged and dropped. Output keeps first-seen order, and each
/// group keeps the spelling and department of its first member.
pub fn combine_ingredients<'a, I>(ingredients: I) -> Vec<AggregatedIngredient>
where
    I: IntoIterator<Item = &'a Ingredient>,
{
    let mut combined: Vec<AggregatedIngredient> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for ingredient in ingredients {
        if ingredient.name.trim().is_empty() || ingredient.unit.trim().is_empty() {
            warn!("Invalid ingredient data (missing name or unit): {:?}", ingredient);
            continue;
        }

        let quantity = match parse_quantity(&ingredient.quantity) {
            Some(q) if q != 0.0 => q,
            _ => {
                warn!(
                    "Invalid ingredient quantity '{}' for '{}'",
                    ingredient.quantity, ingredient.name
                );
                continue;
            }
        };

        let key = item_key(&ingredient.name, &ingredient.unit);
        match positions.get(&key) {
            Some(&pos) => combined[pos].quantity += quantity,
            None => {
                positions.insert(key, combined.len());
                combined.push(AggregatedIngredient {
                    name: ingredient.name.clone(),
                    unit: ingredient.unit.clone(),
                    quantity,
                    department: ingredient.department.clone(),
                });
            }
        }
    }

    combined
}

/// Fold aggregated lines into the current shopping list
///
/// Lines whose key is already on the list add to its quantity and keep their
/// `checked` flag; new keys are appended unchecked.
pub fn merge_into_list(
    existing: Vec<ShoppingListItem>,
    additions: &[AggregatedIngredient],
) -> Vec<ShoppingListItem> {
    let mut merged = existing;
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (pos, item) in merged.iter().enumerate() {
        positions.entry(item.key()).or_insert(pos);
    }

    for addition in additions {
        let key = item_key(&addition.name, &addition.unit);
        match positions.get(&key) {
            Some(&pos) => merged[pos].quantity += addition.quantity,
            None => {
                positions.insert(key, merged.len());
                merged.push(ShoppingListItem {
                    id: None,
                    name: addition.name.clone(),
                    unit: addition.unit.clone(),
                    quantity: addition.quantity,
                    department: Some(
                        addition
                            .department
                            .clone()
                            .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
                    ),
                    checked: false,
                });
            }
        }
    }

    merged
}

/// Flip the `checked` flag of the line with this key; false when no line matches
pub fn toggle_checked(items: &mut [ShoppingListItem], key: &str) -> bool {
    match items.iter_mut().find(|item| item.key() == key) {
        Some(item) => {
            item.checked = !item.checked;
            true
        }
        None => false,
    }
}
