//! Error types for device capabilities.

use thiserror::Error;

/// Errors reported by a platform provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The user denied access to the capability.
    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),

    /// The capability is not available right now (no GPS fix, etc.).
    #[error("{0} unavailable")]
    Unavailable(String),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;
