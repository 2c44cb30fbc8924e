//! Automatic column synchronization
//!
//! Databases created by older builds of the app can miss columns added since
//! (e.g. `shopping_list.checked`). Each table declares the columns it expects;
//! on startup missing ones are added with `ALTER TABLE ADD COLUMN`.
//!
//! Runs after CREATE TABLE IF NOT EXISTS and before versioned migrations.
//! Type and constraint differences are only reported: SQLite cannot change
//! them in place, that needs a migration.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Expected column with the constraints that matter for ALTER TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type, e.g. "TEXT", "INTEGER", "REAL"
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// DEFAULT clause, as SQL text (quote string literals yourself)
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Column as reported by PRAGMA table_info
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub pk: bool,
}

/// Difference between the declared and the actual table
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Column absent from the database; fixable
    MissingColumn { table: String, column: ColumnDefinition },
    /// Column present with an incompatible type; reported only
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
}

/// Declared schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Read a table's columns, ordered by position
pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
    let query = format!("PRAGMA table_info({})", table_name);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut columns = rows
        .iter()
        .map(|row| -> std::result::Result<ActualColumn, sqlx::Error> {
            Ok(ActualColumn {
                cid: row.try_get("cid")?,
                name: row.try_get("name")?,
                type_name: row.try_get("type")?,
                not_null: row.try_get::<i32, _>("notnull")? != 0,
                pk: row.try_get::<i32, _>("pk")? != 0,
            })
        })
        .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

    columns.sort_by_key(|c| c.cid);
    Ok(columns)
}

pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Compare declared columns against the actual table
pub fn compare(
    table_name: &str,
    expected: &[ColumnDefinition],
    actual: &[ActualColumn],
) -> Vec<SchemaDrift> {
    expected
        .iter()
        .filter_map(|expected_col| match actual.iter().find(|c| c.name == expected_col.name) {
            None => Some(SchemaDrift::MissingColumn {
                table: table_name.to_string(),
                column: expected_col.clone(),
            }),
            Some(actual_col)
                if !types_compatible(&expected_col.sql_type, &actual_col.type_name) =>
            {
                Some(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                })
            }
            Some(_) => None,
        })
        .collect()
}

/// Same SQLite type affinity
fn types_compatible(expected: &str, actual: &str) -> bool {
    fn affinity(sql_type: &str) -> &'static str {
        let t = sql_type.to_uppercase();
        if t.contains("INT") {
            "INTEGER"
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            "TEXT"
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            "REAL"
        } else if t.is_empty() || t.contains("BLOB") {
            "BLOB"
        } else {
            "NUMERIC"
        }
    }

    affinity(expected) == affinity(actual)
}

/// Add missing columns to one table
///
/// Returns the number of columns added. A table that does not exist yet is
/// skipped; CREATE TABLE owns it.
pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<usize> {
    let table_name = T::table_name();

    if !table_exists(pool, table_name).await? {
        warn!("Schema sync: table '{}' does not exist, skipping", table_name);
        return Ok(0);
    }

    let actual = introspect_table(pool, table_name).await?;
    let drift = compare(table_name, &T::expected_columns(), &actual);

    if drift.is_empty() {
        debug!("Schema sync: '{}' up to date", table_name);
        return Ok(0);
    }

    let mut added = 0;
    for change in drift {
        match change {
            SchemaDrift::MissingColumn { table, column } => {
                if add_column(pool, &table, &column).await? {
                    added += 1;
                }
            }
            SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                warn!(
                    "Schema sync: {}.{} is '{}', expected '{}'. Needs a migration.",
                    table, column, actual, expected
                );
            }
        }
    }

    Ok(added)
}

/// ALTER TABLE ADD COLUMN; false when the column turned out to exist already
async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<bool> {
    let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column.name, column.sql_type);

    if column.primary_key {
        warn!(
            "Schema sync: cannot add PRIMARY KEY column {}.{}; adding it without the constraint",
            table, column.name
        );
    }

    // SQLite only accepts NOT NULL on an added column when it has a default
    match (&column.default_value, column.not_null) {
        (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
        (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
        (None, true) => warn!(
            "Schema sync: {}.{} is NOT NULL without a default; adding it as nullable",
            table, column.name
        ),
        (None, false) => {}
    }

    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => {
            info!("Schema sync: added column {}.{}", table, column.name);
            Ok(true)
        }
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            debug!("Schema sync: {}.{} already present", table, column.name);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    struct NotesSchema;

    impl TableSchema for NotesSchema {
        fn table_name() -> &'static str {
            "notes"
        }

        fn expected_columns() -> Vec<ColumnDefinition> {
            vec![
                ColumnDefinition::new("id", "INTEGER").primary_key(),
                ColumnDefinition::new("body", "TEXT").not_null(),
                ColumnDefinition::new("pinned", "INTEGER").not_null().default("0"),
                ColumnDefinition::new("color", "TEXT").default("'yellow'"),
            ]
        }
    }

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_adds_missing_columns_with_defaults() {
        let pool = setup_test_db().await;
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO notes (body) VALUES ('old row')")
            .execute(&pool)
            .await
            .unwrap();

        let added = sync_table::<NotesSchema>(&pool).await.unwrap();
        assert_eq!(added, 2);

        let (pinned, color): (i64, String) = sqlx::query_as("SELECT pinned, color FROM notes")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(pinned, 0);
        assert_eq!(color, "yellow");

        // Second run is a no-op
        assert_eq!(sync_table::<NotesSchema>(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_table_skipped() {
        let pool = setup_test_db().await;
        assert_eq!(sync_table::<NotesSchema>(&pool).await.unwrap(), 0);
        assert!(!table_exists(&pool, "notes").await.unwrap());
    }

    #[test]
    fn test_compare_reports_type_mismatch() {
        let column = |cid, name: &str, type_name: &str, not_null, pk| ActualColumn {
            cid,
            name: name.into(),
            type_name: type_name.into(),
            not_null,
            pk,
        };
        let actual = vec![
            column(0, "id", "INTEGER", false, true),
            column(1, "body", "REAL", true, false),
            column(2, "pinned", "INT", true, false),
            column(3, "color", "VARCHAR(20)", false, false),
        ];
        let drift = compare("notes", &NotesSchema::expected_columns(), &actual);
        assert_eq!(drift.len(), 1);
        assert!(matches!(&drift[0], SchemaDrift::TypeMismatch { column, .. } if column == "body"));
    }
}
