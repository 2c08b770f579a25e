//! Auth store: session lifecycle and the signed-in user's profile.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::error::{AuthError, AuthResult};
use super::secrets::{SecretStore, SESSION_TOKENS_KEY};
use super::types::{
    AuthSession, AuthUser, OtpTarget, ProfileUpdate, SecretToken, SignUpOutcome, UserProfile,
};
use super::validation::{
    validate_credentials, validate_display_name, validate_email, validate_otp, validate_phone,
};
use crate::backend::{Backend, BackendError};
use crate::storage::{LocalStore, AUTH_SESSION_KEY};

/// Refresh the access token when it expires within this many seconds.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Non-secret half of a persisted session, kept in the local database.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    expires_at: i64,
    user: AuthUser,
}

/// Secret half of a persisted session, kept in the [`SecretStore`].
#[derive(Serialize, Deserialize)]
struct SessionTokens {
    access_token: SecretToken,
    refresh_token: SecretToken,
}

#[derive(Debug, Default)]
struct AuthState {
    session: Option<AuthSession>,
    profile: Option<UserProfile>,
}

/// Holds the current session and profile and keeps the backend's bearer
/// token in step with them.
pub struct AuthStore {
    backend: Arc<dyn Backend>,
    store: Arc<LocalStore>,
    secrets: Arc<dyn SecretStore>,
    state: RwLock<AuthState>,
    refreshing: Mutex<()>,
}

impl AuthStore {
    /// Creates a signed-out store. Call [`restore_session`](Self::restore_session)
    /// to pick up a persisted session.
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<LocalStore>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            backend,
            store,
            secrets,
            state: RwLock::new(AuthState::default()),
            refreshing: Mutex::new(()),
        }
    }

    /// Whether a session is installed.
    pub async fn is_signed_in(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    /// Id of the signed-in user.
    pub async fn current_user_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.user.id.clone())
    }

    /// Id of the signed-in user, or [`AuthError::NotSignedIn`].
    ///
    /// # Errors
    ///
    /// Fails when signed out.
    pub async fn require_user_id(&self) -> AuthResult<String> {
        self.current_user_id().await.ok_or(AuthError::NotSignedIn)
    }

    /// Id of the signed-in user, with the access token refreshed first if
    /// it is about to expire. Authenticated requests call this before
    /// touching the backend.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotSignedIn`], or backend errors from the refresh. A
    /// rejected refresh signs the user out.
    pub async fn authorized(&self) -> AuthResult<String> {
        self.ensure_fresh_session(Utc::now().timestamp()).await?;
        self.require_user_id().await
    }

    /// As [`authorized`](Self::authorized), but `None` when signed out.
    ///
    /// # Errors
    ///
    /// Backend errors from the refresh.
    pub async fn authorized_if_signed_in(&self) -> AuthResult<Option<String>> {
        match self.authorized().await {
            Ok(user_id) => Ok(Some(user_id)),
            Err(AuthError::NotSignedIn) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The last loaded profile.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.state.read().await.profile.clone()
    }

    /// Signs in with email and password and loads the profile.
    ///
    /// # Errors
    ///
    /// Validation errors for malformed input, backend errors otherwise.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<UserProfile> {
        validate_credentials(email, password)?;
        let session = self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await?;
        info!(user_id = %session.user.id, "Signed in with password");
        self.install(session).await?;
        self.fetch_profile().await
    }

    /// Creates an email + password account.
    ///
    /// When the project issues a session right away the user row is created
    /// and the outcome is [`SignUpOutcome::SignedIn`].
    ///
    /// # Errors
    ///
    /// Validation errors for malformed input, backend errors otherwise.
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        validate_credentials(email, password)?;
        let response = self.backend.sign_up(email.trim(), password).await?;

        match response.session {
            Some(session) => {
                info!(user_id = %response.user_id, "Signed up");
                self.install(session).await?;
                let profile = self.fetch_profile().await?;
                Ok(SignUpOutcome::SignedIn(Box::new(profile)))
            }
            None => {
                info!(user_id = %response.user_id, "Signed up, awaiting email confirmation");
                Ok(SignUpOutcome::ConfirmationRequired {
                    user_id: response.user_id,
                })
            }
        }
    }

    /// Sends a magic code to `email`.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn send_email_otp(&self, email: &str) -> AuthResult<()> {
        validate_email(email)?;
        self.backend
            .send_otp(&OtpTarget::Email(email.trim().to_string()))
            .await?;
        debug!("Email code sent");
        Ok(())
    }

    /// Sends an SMS code to `phone`.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn send_phone_otp(&self, phone: &str) -> AuthResult<()> {
        validate_phone(phone)?;
        self.backend
            .send_otp(&OtpTarget::Phone(phone.trim().to_string()))
            .await?;
        debug!("SMS code sent");
        Ok(())
    }

    /// Verifies an email code and signs in.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn verify_email_otp(&self, email: &str, code: &str) -> AuthResult<UserProfile> {
        validate_email(email)?;
        self.verify(OtpTarget::Email(email.trim().to_string()), code)
            .await
    }

    /// Verifies an SMS code and signs in.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn verify_phone_otp(&self, phone: &str, code: &str) -> AuthResult<UserProfile> {
        validate_phone(phone)?;
        self.verify(OtpTarget::Phone(phone.trim().to_string()), code)
            .await
    }

    async fn verify(&self, target: OtpTarget, code: &str) -> AuthResult<UserProfile> {
        validate_otp(code)?;
        let session = self.backend.verify_otp(&target, code.trim()).await?;
        info!(user_id = %session.user.id, "Signed in with one-time code");
        self.install(session).await?;
        self.fetch_profile().await
    }

    /// Signs out locally. The server-side revocation is best effort.
    ///
    /// # Errors
    ///
    /// Fails only if the persisted session cannot be removed.
    pub async fn sign_out(&self) -> AuthResult<()> {
        if self.is_signed_in().await {
            if let Err(e) = self.backend.sign_out().await {
                warn!(error = %e, "Server sign-out failed; clearing local session anyway");
            }
        }
        self.clear().await?;
        info!("Signed out");
        Ok(())
    }

    /// Restores the persisted session, refreshing it if it is about to
    /// expire, and loads the profile.
    ///
    /// Returns `None` when there is no session or the backend no longer
    /// accepts it.
    ///
    /// # Errors
    ///
    /// Storage failures, or a transient backend failure (the session stays
    /// installed so a later call can retry).
    pub async fn restore_session(&self, now: i64) -> AuthResult<Option<UserProfile>> {
        let Some(session) = self.load_persisted()? else {
            debug!("No persisted session");
            return Ok(None);
        };

        self.backend
            .set_access_token(Some(session.access_token.clone()));
        self.state.write().await.session = Some(session);

        let result = match self.ensure_fresh_session(now).await {
            Ok(()) => self.fetch_profile().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(AuthError::Backend(BackendError::Unauthorized(reason))) => {
                info!(%reason, "Persisted session rejected; signing out");
                self.clear().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Refreshes the access token if it expires within
    /// [`REFRESH_MARGIN_SECS`] of `now`.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotSignedIn`] when signed out, backend errors from the
    /// refresh.
    pub async fn ensure_fresh_session(&self, now: i64) -> AuthResult<()> {
        if !self.needs_refresh(now).await? {
            return Ok(());
        }

        // One refresh at a time; refresh tokens are single use.
        let _guard = self.refreshing.lock().await;
        let refresh_token = {
            let state = self.state.read().await;
            let session = state.session.as_ref().ok_or(AuthError::NotSignedIn)?;
            if !session.expires_within(now, REFRESH_MARGIN_SECS) {
                return Ok(());
            }
            session.refresh_token.clone()
        };

        debug!("Refreshing access token");
        match self.backend.refresh_session(&refresh_token).await {
            Ok(session) => self.install(session).await,
            Err(BackendError::Unauthorized(reason)) => {
                info!(%reason, "Refresh token rejected; signing out");
                self.clear().await?;
                Err(BackendError::Unauthorized(reason).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn needs_refresh(&self, now: i64) -> AuthResult<bool> {
        let state = self.state.read().await;
        let session = state.session.as_ref().ok_or(AuthError::NotSignedIn)?;
        Ok(session.expires_within(now, REFRESH_MARGIN_SECS))
    }

    /// Loads the signed-in user's row, creating it on first sign-in.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotSignedIn`] or backend errors.
    pub async fn fetch_profile(&self) -> AuthResult<UserProfile> {
        let user = self
            .state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(AuthError::NotSignedIn)?;

        let profile = match self.backend.fetch_user(&user.id).await? {
            Some(profile) => profile,
            None => {
                info!(user_id = %user.id, "Creating user row");
                self.backend
                    .create_user(&UserProfile::new_for(&user))
                    .await?
            }
        };

        self.state.write().await.profile = Some(profile.clone());
        Ok(profile)
    }

    /// Applies a partial profile update.
    ///
    /// # Errors
    ///
    /// Validation errors for a bad display name, [`AuthError::NotSignedIn`],
    /// or backend errors.
    pub async fn update_profile(&self, mut update: ProfileUpdate) -> AuthResult<UserProfile> {
        if let Some(name) = update.display_name.as_mut() {
            validate_display_name(name)?;
            *name = name.trim().to_string();
        }
        let user_id = self.authorized().await?;

        if update.is_empty() {
            return match self.profile().await {
                Some(profile) => Ok(profile),
                None => self.fetch_profile().await,
            };
        }

        let profile = self.backend.update_user(&user_id, &update).await?;
        debug!(user_id = %user_id, "Profile updated");
        self.state.write().await.profile = Some(profile.clone());
        Ok(profile)
    }

    /// Stores the onboarding answers and marks onboarding done.
    ///
    /// # Errors
    ///
    /// As [`update_profile`](Self::update_profile).
    pub async fn complete_onboarding(
        &self,
        display_name: &str,
        university_id: Option<String>,
    ) -> AuthResult<UserProfile> {
        self.update_profile(ProfileUpdate {
            display_name: Some(display_name.to_string()),
            university_id,
            onboarding_completed: Some(true),
            ..ProfileUpdate::default()
        })
        .await
    }

    /// Records the device push token.
    ///
    /// # Errors
    ///
    /// As [`update_profile`](Self::update_profile).
    pub async fn set_push_token(&self, token: &str) -> AuthResult<UserProfile> {
        self.update_profile(ProfileUpdate {
            push_token: Some(token.to_string()),
            ..ProfileUpdate::default()
        })
        .await
    }

    /// Updates the notification toggles; `None` leaves a toggle unchanged.
    ///
    /// # Errors
    ///
    /// As [`update_profile`](Self::update_profile).
    pub async fn set_notification_preferences(
        &self,
        new_sessions: Option<bool>,
        prayer_reminders: Option<bool>,
    ) -> AuthResult<UserProfile> {
        self.update_profile(ProfileUpdate {
            notify_new_sessions: new_sessions,
            notify_prayer_reminders: prayer_reminders,
            ..ProfileUpdate::default()
        })
        .await
    }

    /// Reads both halves of the persisted session. A half-written session
    /// (one side missing or unreadable) counts as none.
    fn load_persisted(&self) -> AuthResult<Option<AuthSession>> {
        let Some(record) = self.store.get_json::<SessionRecord>(AUTH_SESSION_KEY)? else {
            return Ok(None);
        };
        let Some(raw) = self.secrets.get(SESSION_TOKENS_KEY)?.map(Zeroizing::new) else {
            warn!("Session tokens missing from secure storage");
            self.discard_persisted()?;
            return Ok(None);
        };
        let tokens: SessionTokens = match serde_json::from_str(&raw) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Unreadable session tokens");
                self.discard_persisted()?;
                return Ok(None);
            }
        };

        Ok(Some(AuthSession {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: record.expires_at,
            user: record.user,
        }))
    }

    async fn install(&self, session: AuthSession) -> AuthResult<()> {
        let tokens = SessionTokens {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
        };
        let raw = Zeroizing::new(
            serde_json::to_string(&tokens)
                .map_err(|e| AuthError::SecureStorage(format!("Cannot encode tokens: {e}")))?,
        );
        self.secrets.set(SESSION_TOKENS_KEY, &raw)?;
        self.store.set_json(
            AUTH_SESSION_KEY,
            &SessionRecord {
                expires_at: session.expires_at,
                user: session.user.clone(),
            },
        )?;
        self.backend
            .set_access_token(Some(session.access_token.clone()));
        self.state.write().await.session = Some(session);
        Ok(())
    }

    fn discard_persisted(&self) -> AuthResult<()> {
        self.store.remove(AUTH_SESSION_KEY)?;
        self.secrets.delete(SESSION_TOKENS_KEY)
    }

    async fn clear(&self) -> AuthResult<()> {
        self.backend.set_access_token(None);
        {
            let mut state = self.state.write().await;
            state.session = None;
            state.profile = None;
        }
        self.discard_persisted()
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore").finish_non_exhaustive()
    }
}
