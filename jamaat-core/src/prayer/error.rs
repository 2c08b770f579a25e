//! Error types for prayer time retrieval.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while fetching or caching prayer times.
#[derive(Debug, Error)]
pub enum PrayerError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("Prayer time API error {code}: {status}")]
    Api {
        /// HTTP status or API `code` field.
        code: u16,
        /// API `status` field or response body.
        status: String,
    },

    /// The response body did not contain a usable timetable.
    #[error("Invalid prayer time response: {0}")]
    InvalidResponse(String),

    /// The local cache could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PrayerError {
    /// Whether the failure is a connectivity problem rather than a bad answer.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Result type for prayer time operations.
pub type PrayerResult<T> = Result<T, PrayerError>;
