//! Authentication and the user profile.
//!
//! [`AuthStore`] owns the session lifecycle: password and one-time-code
//! sign-in, sign-up, refresh, sign-out, and persistence of the session.
//! Tokens go to a [`SecretStore`] (the platform keyring in production);
//! the user and expiry go to the [`LocalStore`](crate::storage::LocalStore).
//! It also holds the signed-in user's `users` row and applies profile and
//! settings edits.

mod error;
pub mod secrets;
mod store;
mod token;
pub mod types;
pub mod validation;

pub use error::{AuthError, AuthResult};
#[cfg(any(test, feature = "test-utils"))]
pub use secrets::MemorySecretStore;
pub use secrets::{KeyringSecretStore, SecretStore, KEYRING_SERVICE, SESSION_TOKENS_KEY};
pub use store::{AuthStore, REFRESH_MARGIN_SECS};
pub use token::jwt_expiry;
pub use types::{
    AuthSession, AuthUser, OtpTarget, ProfileUpdate, SecretToken, SignUpOutcome, SignUpResponse,
    UserProfile,
};
