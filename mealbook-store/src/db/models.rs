//! Database models
//!
//! Row types for every table plus the codecs for the two text columns that
//! hold serialized JSON (`recipes.ingredients` and `recipes.instructions`).

use crate::vocab::DEFAULT_CATEGORY_NAME;
use crate::{Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// One ingredient line of a recipe
///
/// Only ever persisted inside `recipes.ingredients` (and transiently in the
/// shopping list). Quantity stays a string so formatted values like "1.5"
/// round-trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub quantity: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Accept strings, numbers and null where text is expected (older rows hold all three)
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected text, found {}", other))),
    }
}

/// Recipe instructions: free text, a list of steps, or step number → text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Instructions {
    Steps(BTreeMap<u32, String>),
    List(Vec<String>),
    Text(String),
}

impl Default for Instructions {
    fn default() -> Self {
        Instructions::Text(String::new())
    }
}

// Untagged derive cannot read integer map keys back out of JSON object keys,
// so go through serde_json::Value by hand.
impl<'de> Deserialize<'de> for Instructions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Instructions::from_json(value).map_err(D::Error::custom)
    }
}

impl Instructions {
    fn from_json(value: Value) -> std::result::Result<Self, String> {
        match value {
            Value::Object(map) => {
                let mut steps = BTreeMap::new();
                for (key, step) in map {
                    let number = key
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| format!("instruction step key '{}' is not a number", key))?;
                    steps.insert(number, step_text(step)?);
                }
                Ok(Instructions::Steps(steps))
            }
            Value::Array(items) => items
                .into_iter()
                .map(step_text)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Instructions::List),
            Value::String(text) => Ok(Instructions::Text(text)),
            Value::Null => Ok(Instructions::default()),
            other => Err(format!("unsupported instructions value {}", other)),
        }
    }

    /// Interpret text typed or pasted into the recipe form
    ///
    /// JSON objects/arrays are kept as parsed; anything else is split into
    /// non-blank lines numbered from 1.
    pub fn from_user_text(text: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(text);
        if let Ok(value @ (Value::Object(_) | Value::Array(_))) = parsed {
            if let Ok(parsed) = Instructions::from_json(value) {
                return parsed;
            }
        }

        let steps = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .zip(1u32..)
            .map(|(line, number)| (number, line.to_string()))
            .collect();
        Instructions::Steps(steps)
    }

    /// Steps in display order
    pub fn steps(&self) -> Vec<&str> {
        match self {
            Instructions::Steps(map) => map.values().map(String::as_str).collect(),
            Instructions::List(items) => items.iter().map(String::as_str).collect(),
            Instructions::Text(text) if text.is_empty() => Vec::new(),
            Instructions::Text(text) => vec![text.as_str()],
        }
    }
}

fn step_text(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("instruction step must be text, found {}", other)),
    }
}

/// Recipe fields as supplied by the recipe form, before an id exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Instructions,
    pub image: Option<String>,
    #[serde(rename = "totalTime")]
    pub total_time: Option<String>,
}

impl NewRecipe {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("recipe title is empty".to_string()));
        }
        Ok(())
    }
}

/// Stored recipe row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Instructions,
    pub image: Option<String>,
    #[serde(rename = "totalTime")]
    pub total_time: Option<String>,
}

/// Recipe row plus the comma-joined names of its categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeWithCategories {
    #[serde(flatten)]
    pub recipe: Recipe,
    #[serde(rename = "categoryNames")]
    pub category_names: Option<String>,
}

impl RecipeWithCategories {
    /// Category names split back out of the joined column
    pub fn category_list(&self) -> Vec<&str> {
        self.category_names
            .as_deref()
            .map(|names| names.split(',').filter(|n| !n.is_empty()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
}

impl Category {
    /// True for the reserved favorites category
    pub fn is_reserved(&self) -> bool {
        self.name == DEFAULT_CATEGORY_NAME
    }
}

/// One occupied slot of the weekly meal plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlanEntry {
    pub day: String,
    #[serde(rename = "mealType")]
    pub meal_type: String,
    #[serde(rename = "recipeId")]
    pub recipe_id: i64,
}

/// One line of the persisted shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    /// Row id; `None` for items not saved yet
    pub id: Option<i64>,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub department: Option<String>,
    pub checked: bool,
}

impl ShoppingListItem {
    /// Grouping key shared with the aggregator
    pub fn key(&self) -> String {
        crate::shopping::item_key(&self.name, &self.unit)
    }
}

fn parse_error(column: &str, err: impl std::fmt::Display) -> Error {
    Error::Parse(format!("{}: {}", column, err))
}

/// Serialize an ingredient list for `recipes.ingredients`
pub fn encode_ingredients(ingredients: &[Ingredient]) -> Result<String> {
    serde_json::to_string(ingredients).map_err(|e| parse_error("ingredients", e))
}

/// Deserialize `recipes.ingredients`
///
/// Also reads text that was JSON-encoded twice (a JSON string holding the array).
pub fn decode_ingredients(text: &str) -> Result<Vec<Ingredient>> {
    let mut value: Value = serde_json::from_str(text).map_err(|e| parse_error("ingredients", e))?;
    if let Value::String(inner) = value {
        value = serde_json::from_str(&inner).map_err(|e| parse_error("ingredients", e))?;
    }
    serde_json::from_value(value).map_err(|e| parse_error("ingredients", e))
}

/// Serialize instructions for `recipes.instructions`
pub fn encode_instructions(instructions: &Instructions) -> Result<String> {
    serde_json::to_string(instructions).map_err(|e| parse_error("instructions", e))
}

/// Deserialize `recipes.instructions`
///
/// A JSON string is always free text, whatever it contains. A bare object or
/// array is a step map or step list; one that does not read as steps, and
/// text that is not JSON at all, is free text from an older row.
pub fn decode_instructions(text: &str) -> Result<Instructions> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::String(inner)) => Ok(Instructions::Text(inner)),
        Ok(value @ (Value::Object(_) | Value::Array(_))) => match Instructions::from_json(value) {
            Ok(instructions) => Ok(instructions),
            Err(e) => {
                warn!("Instructions are not a step map ({}); keeping them as text", e);
                Ok(Instructions::Text(text.to_string()))
            }
        },
        Ok(_) | Err(_) => Ok(Instructions::Text(text.to_string())),
    }
}

/// Inner JSON of a double-encoded column value, `None` when the text is already single-encoded
pub fn unwrap_double_encoded(text: &str) -> Option<String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::String(inner)) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Object(_) | Value::Array(_)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
