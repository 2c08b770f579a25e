//! Error types for backend requests.

use thiserror::Error;

/// Postgres SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Errors returned by a [`Backend`](super::Backend).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The request did not reach the backend or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// Missing, expired, or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The addressed row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success answer.
    #[error("Backend error {status}: {message}")]
    Api {
        /// HTTP status.
        status: u16,
        /// Error message from the body, or the raw body.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether the request should be retried later instead of surfaced.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type for backend requests.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = BackendError::Api {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Backend error 500: boom");
    }

    #[test]
    fn only_network_is_transient() {
        assert!(BackendError::Network("offline".to_string()).is_transient());
        assert!(!BackendError::Conflict("dup".to_string()).is_transient());
        assert!(!BackendError::Unauthorized("expired".to_string()).is_transient());
    }
}
