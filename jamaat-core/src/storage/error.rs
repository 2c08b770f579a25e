//! Error types for local storage.

use thiserror::Error;

/// Error type for local storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Storage could not be opened or locked.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored value could not be encoded or decoded.
    #[error("Invalid stored value for {key}: {reason}")]
    InvalidValue {
        /// Key of the offending entry.
        key: String,
        /// Serialization failure description.
        reason: String,
    },
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
