//! Category repository
//!
//! The reserved favorites category (`vocab::DEFAULT_CATEGORY_NAME`) is
//! seeded at startup and can never be deleted through this repository.

use crate::db::models::Category;
use crate::vocab::DEFAULT_CATEGORY_NAME;
use crate::{Error, Result};
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

#[derive(Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a category and return its id
    ///
    /// The name is trimmed and must not be empty. An exact (case-sensitive)
    /// name match with an existing category fails with `DuplicateCategory`.
    pub async fn insert_category(&self, name: &str, image: Option<&str>) -> Result<i64> {
        let name = validate_name(name)?;

        if self.fetch_category_by_name(name).await?.is_some() {
            return Err(Error::DuplicateCategory(name.to_string()));
        }

        let result = sqlx::query("INSERT INTO categories (name, image) VALUES (?, ?)")
            .bind(name)
            .bind(image)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                info!("New category inserted: '{}' (id {})", name, id);
                Ok(id)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Error::DuplicateCategory(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Id of the category with this name, inserting it when absent
    pub async fn ensure_category(&self, name: &str) -> Result<i64> {
        let name = validate_name(name)?;

        if let Some(existing) = self.fetch_category_by_name(name).await? {
            info!("Category already exists: '{}' (id {})", name, existing.id);
            return Ok(existing.id);
        }

        match self.insert_category(name, None).await {
            // Lost a race with another writer; the row is there now
            Err(Error::DuplicateCategory(_)) => self
                .fetch_category_by_name(name)
                .await?
                .map(|c| c.id)
                .ok_or_else(|| Error::NotFound(format!("category '{}'", name))),
            other => other,
        }
    }

    /// All categories, by ascending id
    pub async fn fetch_all_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, image FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<Category> {
                Ok(Category {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    image: row.try_get("image")?,
                })
            })
            .collect()
    }

    pub async fn fetch_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row: Option<(i64, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, image FROM categories WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, name, image)| Category { id, name, image }))
    }

    /// Delete a category and (by cascade) its recipe links
    ///
    /// Returns false when nothing was deleted: unknown id, or the reserved
    /// favorites category, which is always kept.
    pub async fn delete_category_by_id(&self, id: i64) -> Result<bool> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match name {
            None => Ok(false),
            Some(name) if name == DEFAULT_CATEGORY_NAME => {
                warn!("Refusing to delete reserved category '{}' (id {})", name, id);
                Ok(false)
            }
            Some(name) => {
                // Name guard repeated in SQL
                let deleted = sqlx::query("DELETE FROM categories WHERE id = ? AND name <> ?")
                    .bind(id)
                    .bind(DEFAULT_CATEGORY_NAME)
                    .execute(&self.pool)
                    .await?
                    .rows_affected();

                if deleted > 0 {
                    info!("Category '{}' (id {}) deleted", name, id);
                }
                Ok(deleted > 0)
            }
        }
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("category name is empty".to_string()));
    }
    Ok(name)
}
