//! Backend-as-a-service collaborator.
//!
//! Everything the stores need from the hosted backend sits behind the
//! [`Backend`] trait: auth, the `users` / `universities` / `prayer_spaces`
//! tables, the `get_sessions_within_radius` RPC, and session and attendee
//! writes. [`SupabaseClient`] implements it over HTTP; tests substitute an
//! in-memory fake.

mod error;
pub mod rows;
mod supabase;

use async_trait::async_trait;

pub use error::{BackendError, BackendResult, UNIQUE_VIOLATION};
pub use rows::{
    AttendeeRecordRow, AttendeeRow, AttendeeUserRow, NearbySessionRow, NewSessionRow,
    RadiusQuery, SessionRow,
};
pub use supabase::{classify_error, parse_auth_session, parse_sign_up, SupabaseClient};

use crate::auth::{AuthSession, OtpTarget, ProfileUpdate, SecretToken, SignUpResponse, UserProfile};
use crate::university::{PrayerSpace, University};

/// Remote auth and data operations.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Installs (or clears) the bearer token sent with data requests.
    fn set_access_token(&self, token: Option<SecretToken>);

    // Auth

    /// Email + password sign-in.
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> BackendResult<AuthSession>;

    /// Registers an email + password account.
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpResponse>;

    /// Sends a one-time passcode.
    async fn send_otp(&self, target: &OtpTarget) -> BackendResult<()>;

    /// Exchanges a one-time passcode for a session.
    async fn verify_otp(&self, target: &OtpTarget, code: &str) -> BackendResult<AuthSession>;

    /// Exchanges a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &SecretToken) -> BackendResult<AuthSession>;

    /// Revokes the current session server-side.
    async fn sign_out(&self) -> BackendResult<()>;

    // Users

    /// Reads a `users` row; `None` when it does not exist yet.
    async fn fetch_user(&self, user_id: &str) -> BackendResult<Option<UserProfile>>;

    /// Inserts a `users` row.
    async fn create_user(&self, profile: &UserProfile) -> BackendResult<UserProfile>;

    /// Patches a `users` row and returns the stored result.
    async fn update_user(&self, user_id: &str, update: &ProfileUpdate)
        -> BackendResult<UserProfile>;

    // Reference data

    /// Active universities, by name.
    async fn fetch_universities(&self) -> BackendResult<Vec<University>>;

    /// Verified prayer spaces, optionally limited to one university.
    async fn fetch_prayer_spaces(&self, university_id: Option<&str>)
        -> BackendResult<Vec<PrayerSpace>>;

    // Sessions

    /// Runs the radius RPC.
    async fn sessions_within_radius(&self, query: &RadiusQuery)
        -> BackendResult<Vec<NearbySessionRow>>;

    /// Ids among `session_ids` that `user_id` has joined.
    async fn joined_session_ids(
        &self,
        user_id: &str,
        session_ids: &[String],
    ) -> BackendResult<Vec<String>>;

    /// Inserts a session and returns the stored row.
    async fn insert_session(&self, session: &NewSessionRow) -> BackendResult<SessionRow>;

    /// Marks a session cancelled.
    async fn cancel_session(&self, session_id: &str) -> BackendResult<()>;

    // Attendees

    /// Records `user_id` as attending. A duplicate yields [`BackendError::Conflict`].
    async fn insert_attendee(&self, session_id: &str, user_id: &str)
        -> BackendResult<AttendeeRecordRow>;

    /// Removes the attendance record.
    async fn delete_attendee(&self, session_id: &str, user_id: &str) -> BackendResult<()>;

    /// Attendees of a session with their display names, earliest first.
    async fn fetch_attendees(&self, session_id: &str) -> BackendResult<Vec<AttendeeRow>>;
}
