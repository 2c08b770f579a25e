//! Error types for authentication and profile operations.

use thiserror::Error;

use crate::backend::BackendError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

/// Errors that can occur in the auth store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A form field is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotSignedIn,

    /// The backend rejected or failed the request.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The persisted session could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The platform credential store failed.
    #[error("Secure storage failed: {0}")]
    SecureStorage(String),
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
