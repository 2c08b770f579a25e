//! Error types for location handling.

use thiserror::Error;

/// Errors raised when validating location input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    /// Coordinates are NaN, infinite, or outside the valid range.
    #[error("Invalid coordinates: ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// Offending latitude.
        latitude: f64,
        /// Offending longitude.
        longitude: f64,
    },
}

/// Result type alias for location operations.
pub type Result<T> = std::result::Result<T, LocationError>;
