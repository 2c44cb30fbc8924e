//! Store configuration and database path resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application folder name under the platform config/data directories
const APP_DIR: &str = "mealbook";

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "recipes.db";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
const DEFAULT_LOG_FILTER: &str = "info";

/// Resolved store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub log_filter: String,
}

/// On-disk TOML configuration; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub max_connections: Option<u32>,
    pub busy_timeout_ms: Option<u64>,
    pub log_filter: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl StoreConfig {
    /// Config for a database at an explicit path, all other settings default
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }

    /// Resolve configuration in priority order:
    /// 1. Explicit database path (highest priority)
    /// 2. TOML config file
    /// 3. OS-dependent default (fallback)
    ///
    /// A missing or unreadable config file is not an error.
    pub fn resolve(explicit_path: Option<&Path>) -> Self {
        let mut config = match config_file_path() {
            Some(path) => match Self::load_file(&path) {
                Ok(config) => {
                    info!("Loaded store config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        if let Some(path) = explicit_path {
            config.database_path = path.to_path_buf();
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text, filling unset keys with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;
        let defaults = Self::default();

        let config = Self {
            database_path: parsed.database_path.unwrap_or(defaults.database_path),
            max_connections: parsed.max_connections.unwrap_or(defaults.max_connections),
            busy_timeout_ms: parsed.busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
            log_filter: parsed.log_filter.unwrap_or(defaults.log_filter),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the store cannot open with
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::Config("max_connections must be at least 1".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("database_path is empty".to_string()));
        }
        Ok(())
    }
}

/// `<config_dir>/mealbook/config.toml` if it exists
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .filter(|p| p.exists())
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./mealbook_data"))
        .join(DATABASE_FILE)
}
