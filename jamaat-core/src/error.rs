//! Crate-level error type.
//!
//! Every module error converts into [`CoreError`]. The UI branches on
//! [`CoreError::kind`] (inline field error, toast, settings prompt, sign-in
//! screen) and shows [`CoreError::user_message`].

use thiserror::Error;

use crate::auth::AuthError;
use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::location::LocationError;
use crate::platform::PlatformError;
use crate::prayer::PrayerError;
use crate::session::SessionError;
use crate::storage::StorageError;
use crate::validation::ValidationError;

/// How a failure should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input, shown next to the field.
    Validation,
    /// Connectivity or upstream API failure.
    Network,
    /// The write clashed with existing data (e.g. duplicate join).
    Conflict,
    /// A device permission is missing or the user lacks rights.
    PermissionDenied,
    /// Signed out or the session was rejected.
    Unauthorized,
    /// The target no longer exists.
    NotFound,
    /// Local persistence failed.
    Storage,
    /// Anything else.
    Internal,
}

/// Any error the core can return.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Prayer(#[from] PrayerError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// A device permission the operation needs was denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),
}

/// Result type for facade operations.
pub type CoreResult<T> = Result<T, CoreError>;

const fn backend_kind(err: &BackendError) -> ErrorKind {
    match err {
        BackendError::Network(_) | BackendError::Api { .. } | BackendError::Decode(_) => {
            ErrorKind::Network
        }
        BackendError::Unauthorized(_) => ErrorKind::Unauthorized,
        BackendError::Conflict(_) => ErrorKind::Conflict,
        BackendError::NotFound(_) => ErrorKind::NotFound,
    }
}

fn validation_message(err: &ValidationError) -> String {
    err.0.first().map_or_else(
        || "Please check the highlighted fields.".to_string(),
        |e| e.message.clone(),
    )
}

impl CoreError {
    /// Presentation category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Internal,
            Self::Location(_) => ErrorKind::Validation,
            Self::Storage(_)
            | Self::Prayer(PrayerError::Storage(_))
            | Self::Auth(AuthError::Storage(_) | AuthError::SecureStorage(_))
            | Self::Session(SessionError::Credentials(_)) => ErrorKind::Storage,
            Self::Prayer(_) => ErrorKind::Network,
            Self::Backend(e)
            | Self::Auth(AuthError::Backend(e))
            | Self::Session(SessionError::Backend(e)) => backend_kind(e),
            Self::Auth(AuthError::Validation(_))
            | Self::Session(SessionError::Validation(_) | SessionError::NoFeedLocation) => {
                ErrorKind::Validation
            }
            Self::Auth(AuthError::NotSignedIn) | Self::Session(SessionError::NotSignedIn) => {
                ErrorKind::Unauthorized
            }
            Self::Session(SessionError::AlreadyJoined(_)) => ErrorKind::Conflict,
            Self::Session(SessionError::NotCreator(_))
            | Self::Platform(PlatformError::PermissionDenied(_))
            | Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::Session(SessionError::InvalidRow(_))
            | Self::Platform(PlatformError::Unavailable(_)) => ErrorKind::Internal,
        }
    }

    /// Whether the failure is a connectivity problem.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Backend(e) | Self::Auth(AuthError::Backend(e)) => e.is_transient(),
            Self::Session(e) => e.is_transient(),
            Self::Prayer(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Friendly text for the UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(AuthError::Validation(e)) | Self::Session(SessionError::Validation(e)) => {
                validation_message(e)
            }
            Self::Session(SessionError::AlreadyJoined(_)) => {
                "You've already joined this prayer.".to_string()
            }
            Self::Session(SessionError::NotCreator(_)) => {
                "Only the organizer can cancel this prayer.".to_string()
            }
            Self::Session(SessionError::NoFeedLocation) => {
                "Set your location to see nearby prayers.".to_string()
            }
            Self::Auth(AuthError::Backend(BackendError::Unauthorized(_))) => {
                "Sign-in failed. Check your details and try again.".to_string()
            }
            Self::PermissionDenied(capability)
            | Self::Platform(PlatformError::PermissionDenied(capability)) => format!(
                "{} access is off. You can turn it on in Settings.",
                capitalize(capability)
            ),
            _ => generic_message(self.kind()).to_string(),
        }
    }
}

const fn generic_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "Please check the highlighted fields.",
        ErrorKind::Network => "Can't reach the server. Check your connection and try again.",
        ErrorKind::Conflict => "That change conflicts with existing data.",
        ErrorKind::PermissionDenied => "You don't have permission to do that.",
        ErrorKind::Unauthorized => "Please sign in again.",
        ErrorKind::NotFound => "This prayer is no longer available.",
        ErrorKind::Storage => "Couldn't save data on this device.",
        ErrorKind::Internal => "Something went wrong. Please try again.",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_join_is_conflict() {
        let err = CoreError::from(SessionError::AlreadyJoined("s1".to_string()));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.user_message(), "You've already joined this prayer.");
    }

    #[test]
    fn validation_shows_first_field_message() {
        let err = CoreError::from(SessionError::Validation(ValidationError::single(
            "prayerSpaceId",
            "Please select a prayer space",
        )));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Please select a prayer space");
    }

    #[test]
    fn network_errors_are_transient() {
        let err = CoreError::from(SessionError::Backend(BackendError::Network(
            "offline".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_transient());
        assert!(!CoreError::from(BackendError::Conflict("dup".to_string())).is_transient());
    }

    #[test]
    fn permission_denied_points_to_settings() {
        let err = CoreError::PermissionDenied("location");
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(
            err.user_message(),
            "Location access is off. You can turn it on in Settings."
        );
    }

    #[test]
    fn backend_statuses_map_to_kinds() {
        assert_eq!(
            CoreError::from(BackendError::NotFound("s1".to_string())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::from(AuthError::NotSignedIn).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            CoreError::from(PrayerError::Network("timeout".to_string())).kind(),
            ErrorKind::Network
        );
    }

    #[test]
    fn keyring_failures_are_storage() {
        let err = CoreError::from(AuthError::SecureStorage("locked".to_string()));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.user_message(), "Couldn't save data on this device.");
        assert_eq!(
            CoreError::from(SessionError::Credentials("locked".to_string())).kind(),
            ErrorKind::Storage
        );
    }
}
