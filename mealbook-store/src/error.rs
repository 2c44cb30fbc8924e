//! Common error types for the Mealbook store

use thiserror::Error;

/// Common result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every repository and engine in the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Schema creation or database open failed; the store is unusable
    #[error("Storage initialization failed: {0}")]
    StorageInit(String),

    /// A single insert/update/delete or read failed (wraps sqlx::Error)
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Day or meal type label outside the fixed vocabularies
    #[error("Invalid meal slot: {0}")]
    InvalidSlot(String),

    /// Scaling factor that is zero, negative or not a number
    #[error("Invalid conversion factor: {0}")]
    InvalidFactor(f64),

    /// A category with this exact name already exists
    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    /// Ingredient or instructions text failed to deserialize
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid user input rejected before any write
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap any failure raised while opening or creating the schema
    pub(crate) fn storage_init(err: impl std::fmt::Display) -> Self {
        Error::StorageInit(err.to_string())
    }
}
