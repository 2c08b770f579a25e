//! Error types for session operations.

use thiserror::Error;

use crate::auth::AuthError;
use crate::backend::BackendError;
use crate::validation::ValidationError;

/// Errors that can occur while loading or mutating sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The create form is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotSignedIn,

    /// The feed has no center yet; fetch nearby sessions first.
    #[error("No feed location set")]
    NoFeedLocation,

    /// The user already attends the session.
    #[error("Already joined session {0}")]
    AlreadyJoined(String),

    /// Only the creator may cancel a session.
    #[error("Only the creator can cancel session {0}")]
    NotCreator(String),

    /// A backend row violated the session invariants.
    #[error("Invalid session row: {0}")]
    InvalidRow(String),

    /// The backend rejected or failed the request.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The session credentials could not be read or saved.
    #[error("Credential storage failed: {0}")]
    Credentials(String),
}

impl From<AuthError> for SessionError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotSignedIn => Self::NotSignedIn,
            AuthError::Backend(e) => Self::Backend(e),
            AuthError::Validation(e) => Self::Validation(e),
            AuthError::Storage(e) => Self::Credentials(e.to_string()),
            AuthError::SecureStorage(msg) => Self::Credentials(msg),
        }
    }
}

impl SessionError {
    /// Whether the request failed for connectivity reasons and may be queued.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Backend(e) if e.is_transient())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
