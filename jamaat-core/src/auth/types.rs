//! Auth session and user profile types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A bearer or refresh token.
///
/// The contents are wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wraps a raw token.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the raw token for use in a request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken(***)")
    }
}

/// Identity attached to an auth session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Backend user id.
    pub id: String,
    /// Email, for email sign-ins.
    #[serde(default)]
    pub email: Option<String>,
    /// Phone, for phone sign-ins.
    #[serde(default)]
    pub phone: Option<String>,
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for data requests.
    pub access_token: SecretToken,
    /// Token used to obtain a new access token.
    pub refresh_token: SecretToken,
    /// Access token expiry, Unix seconds.
    pub expires_at: i64,
    /// The signed-in user.
    pub user: AuthUser,
}

impl AuthSession {
    /// Whether the access token expires within `margin_secs` of `now`.
    #[must_use]
    pub const fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at - now <= margin_secs
    }
}

/// Where a one-time passcode is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "address", rename_all = "lowercase")]
pub enum OtpTarget {
    /// Email magic code.
    Email(String),
    /// SMS code to an E.164 phone number.
    Phone(String),
}

/// Outcome of creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account is active and signed in.
    SignedIn(Box<UserProfile>),
    /// The user must confirm their email before signing in.
    ConfirmationRequired {
        /// The new user's id.
        user_id: String,
    },
}

/// Backend answer to a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpResponse {
    /// New user's id.
    pub user_id: String,
    /// Present when the project auto-confirms accounts.
    pub session: Option<AuthSession>,
}

/// A `users` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub push_token: Option<String>,
    #[serde(default = "default_true")]
    pub notify_new_sessions: bool,
    #[serde(default = "default_true")]
    pub notify_prayer_reminders: bool,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

const fn default_true() -> bool {
    true
}

impl UserProfile {
    /// The row created on first authenticated sign-up.
    #[must_use]
    pub fn new_for(user: &AuthUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            display_name: None,
            university_id: None,
            push_token: None,
            notify_new_sessions: true,
            notify_prayer_reminders: true,
            onboarding_completed: false,
            created_at: None,
        }
    }
}

/// Partial update of a `users` row. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_new_sessions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_prayer_reminders: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
}

impl ProfileUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.university_id.is_none()
            && self.push_token.is_none()
            && self.notify_new_sessions.is_none()
            && self.notify_prayer_reminders.is_none()
            && self.onboarding_completed.is_none()
    }

    /// Applies the update to a local copy of the profile.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.display_name {
            profile.display_name = Some(name.clone());
        }
        if let Some(university) = &self.university_id {
            profile.university_id = Some(university.clone());
        }
        if let Some(token) = &self.push_token {
            profile.push_token = Some(token.clone());
        }
        if let Some(flag) = self.notify_new_sessions {
            profile.notify_new_sessions = flag;
        }
        if let Some(flag) = self.notify_prayer_reminders {
            profile.notify_prayer_reminders = flag;
        }
        if let Some(flag) = self.onboarding_completed {
            profile.onboarding_completed = flag;
        }
    }
}
