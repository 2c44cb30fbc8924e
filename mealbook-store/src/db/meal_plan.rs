//! Meal plan repository
//!
//! Weekly plan keyed by (day, meal slot), at most one recipe per slot.
//! Day and slot labels are checked against the fixed vocabularies before
//! any write.

use crate::db::models::MealPlanEntry;
use crate::vocab::{MealSlot, Weekday};
use crate::Result;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Clone)]
pub struct MealPlanRepository {
    pool: SqlitePool,
}

impl MealPlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Put a recipe in a slot, replacing whatever the slot held
    pub async fn insert_meal_plan(&self, day: &str, meal_type: &str, recipe_id: i64) -> Result<()> {
        let (day, slot) = parse_slot(day, meal_type)?;

        sqlx::query(
            r#"
            INSERT INTO meal_plan (day, meal_type, recipe_id) VALUES (?, ?, ?)
            ON CONFLICT (day, meal_type) DO UPDATE SET recipe_id = excluded.recipe_id
            "#,
        )
        .bind(day.label())
        .bind(slot.label())
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;

        info!("Meal plan: {} / {} -> recipe {}", day, slot, recipe_id);
        Ok(())
    }

    /// All occupied slots in insertion order
    pub async fn fetch_meal_plan(&self) -> Result<Vec<MealPlanEntry>> {
        let rows = sqlx::query("SELECT day, meal_type, recipe_id FROM meal_plan ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<MealPlanEntry> {
                Ok(MealPlanEntry {
                    day: row.try_get("day")?,
                    meal_type: row.try_get("meal_type")?,
                    recipe_id: row.try_get("recipe_id")?,
                })
            })
            .collect()
    }

    /// The plan folded into day -> slot -> recipe id
    pub async fn fetch_plan(&self) -> Result<MealPlan> {
        Ok(MealPlan::from_entries(&self.fetch_meal_plan().await?))
    }

    /// Empty one slot; false when it was already empty
    pub async fn delete_specific_meal(&self, day: &str, meal_type: &str) -> Result<bool> {
        let (day, slot) = parse_slot(day, meal_type)?;

        let deleted = sqlx::query("DELETE FROM meal_plan WHERE day = ? AND meal_type = ?")
            .bind(day.label())
            .bind(slot.label())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            info!("Meal plan: cleared {} / {}", day, slot);
        }
        Ok(deleted > 0)
    }

    /// Clear the whole plan, returning the number of slots emptied
    pub async fn delete_meal_plan(&self) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM meal_plan")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!("Meal plan cleared ({} slots)", deleted);
        Ok(deleted)
    }
}

fn parse_slot(day: &str, meal_type: &str) -> Result<(Weekday, MealSlot)> {
    Ok((day.parse::<Weekday>()?, meal_type.parse::<MealSlot>()?))
}

/// Weekly plan as day -> slot -> recipe id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MealPlan {
    slots: BTreeMap<Weekday, BTreeMap<MealSlot, i64>>,
}

impl MealPlan {
    /// Fold stored entries; rows with labels outside the vocabularies are skipped
    pub fn from_entries(entries: &[MealPlanEntry]) -> Self {
        let mut plan = MealPlan::default();
        for entry in entries {
            match parse_slot(&entry.day, &entry.meal_type) {
                Ok((day, slot)) => {
                    plan.slots.entry(day).or_default().insert(slot, entry.recipe_id);
                }
                Err(e) => warn!("Skipping meal plan row: {}", e),
            }
        }
        plan
    }

    pub fn recipe_for(&self, day: Weekday, slot: MealSlot) -> Option<i64> {
        self.slots.get(&day).and_then(|meals| meals.get(&slot)).copied()
    }

    /// Occupied slots of one day
    pub fn day(&self, day: Weekday) -> Option<&BTreeMap<MealSlot, i64>> {
        self.slots.get(&day)
    }

    /// Distinct recipe ids in week order (day, then slot)
    pub fn recipe_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for recipe_id in self.slots.values().flat_map(|meals| meals.values()) {
            if !ids.contains(recipe_id) {
                ids.push(*recipe_id);
            }
        }
        ids
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
