/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Backend lock was poisoned by a panicking writer
    #[error("Storage lock poisoned")]
    Poisoned,
}

impl From<StorageError> for satsang_core::SatsangError {
    fn from(err: StorageError) -> Self {
        satsang_core::SatsangError::storage(err.to_string())
    }
}
