//! The core facade the bridge exposes to Flutter.
//!
//! [`JamaatCore`] is the composition root: it owns the local store, the
//! backend and prayer API clients, and every store built on them, and is
//! passed explicitly to whatever needs it. Session mutations go through it
//! so they can be deferred to the offline queue.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::auth::{
    AuthStore, KeyringSecretStore, ProfileUpdate, SecretStore, SignUpOutcome, UserProfile,
};
use crate::backend::{Backend, SupabaseClient};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::location::Coordinates;
use crate::offline::{ActionKind, ConnectivityMonitor, OfflineAction, OfflineQueue, QueueSummary};
use crate::platform::{LocationProvider, NotificationProvider, PrayerReminderScheduler};
use crate::prayer::{AladhanClient, PrayerTimes, PrayerTimesApi, PrayerTimesCache};
use crate::session::{
    validate_create_session, AttendeeProfile, CreateSessionInput, FeedEntry, FeedPatch,
    PrayerSession, SessionChange, SessionError, SessionResult, SessionStore,
};
use crate::storage::{LocalStore, StorageError};
use crate::university::{PrayerSpace, University, UniversityDirectory};

/// File name of the local database inside the app data directory.
pub const DATABASE_FILE: &str = "jamaat.db";

/// Result of a session mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    /// The backend accepted the change.
    Applied(T),
    /// No connectivity; the change was queued for replay.
    Queued(OfflineAction),
}

impl<T> MutationOutcome<T> {
    /// Whether the change was deferred.
    #[must_use]
    pub const fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }
}

/// Entry point for all Jamaat operations.
pub struct JamaatCore {
    config: CoreConfig,
    auth: Arc<AuthStore>,
    sessions: Arc<SessionStore>,
    prayers: PrayerTimesCache,
    directory: UniversityDirectory,
    queue: OfflineQueue,
    connectivity: ConnectivityMonitor,
}

impl JamaatCore {
    /// Opens (or creates) the local database under `data_dir` and wires the
    /// stores to the given collaborators. Session tokens go to the platform
    /// keyring, which the host must have registered as the `keyring-core`
    /// default store.
    ///
    /// # Errors
    ///
    /// Invalid config or an unusable data directory.
    pub fn new(
        config: CoreConfig,
        data_dir: &Path,
        backend: Arc<dyn Backend>,
        prayer_api: Arc<dyn PrayerTimesApi>,
    ) -> CoreResult<Self> {
        Self::with_secret_store(
            config,
            data_dir,
            backend,
            prayer_api,
            Arc::new(KeyringSecretStore::default()),
        )
    }

    /// [`new`](Self::new) with an explicit store for session tokens.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn with_secret_store(
        config: CoreConfig,
        data_dir: &Path,
        backend: Arc<dyn Backend>,
        prayer_api: Arc<dyn PrayerTimesApi>,
        secrets: Arc<dyn SecretStore>,
    ) -> CoreResult<Self> {
        config.validate()?;
        std::fs::create_dir_all(data_dir).map_err(|e| {
            StorageError::Storage(format!("Cannot create {}: {e}", data_dir.display()))
        })?;
        let store = Arc::new(LocalStore::new(&data_dir.join(DATABASE_FILE))?);
        Ok(Self::from_parts(config, store, secrets, backend, prayer_api))
    }

    /// [`new`](Self::new) with the HTTP backend and prayer time clients.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn with_http_clients(config: CoreConfig, data_dir: &Path) -> CoreResult<Self> {
        let backend = Arc::new(SupabaseClient::new(&config.backend));
        let prayer_api = Arc::new(AladhanClient::new(config.prayer_api.clone()));
        Self::new(config, data_dir, backend, prayer_api)
    }

    /// A core backed by an in-memory database.
    ///
    /// # Errors
    ///
    /// Invalid config.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn in_memory(
        config: CoreConfig,
        backend: Arc<dyn Backend>,
        prayer_api: Arc<dyn PrayerTimesApi>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let store = Arc::new(LocalStore::in_memory()?);
        let secrets = Arc::new(crate::auth::MemorySecretStore::default());
        Ok(Self::from_parts(config, store, secrets, backend, prayer_api))
    }

    fn from_parts(
        config: CoreConfig,
        store: Arc<LocalStore>,
        secrets: Arc<dyn SecretStore>,
        backend: Arc<dyn Backend>,
        prayer_api: Arc<dyn PrayerTimesApi>,
    ) -> Self {
        let auth = Arc::new(AuthStore::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            secrets,
        ));
        let sessions = Arc::new(SessionStore::new(
            Arc::clone(&backend),
            Arc::clone(&auth),
            &config.feed,
        ));

        Self {
            prayers: PrayerTimesCache::new(Arc::clone(&store), prayer_api),
            directory: UniversityDirectory::new(Arc::clone(&backend), Arc::clone(&store)),
            queue: OfflineQueue::new(store),
            connectivity: ConnectivityMonitor::default(),
            auth,
            sessions,
            config,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The auth store, for callers that need more than the facade offers.
    #[must_use]
    pub const fn auth(&self) -> &Arc<AuthStore> {
        &self.auth
    }

    /// The session store.
    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The university directory.
    #[must_use]
    pub const fn directory(&self) -> &UniversityDirectory {
        &self.directory
    }

    // Auth

    /// Email + password sign-in.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn sign_in(&self, email: &str, password: &str) -> CoreResult<UserProfile> {
        Ok(self.auth.sign_in(email, password).await?)
    }

    /// Email + password sign-up.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn sign_up(&self, email: &str, password: &str) -> CoreResult<SignUpOutcome> {
        Ok(self.auth.sign_up(email, password).await?)
    }

    /// Sends an email magic code.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn send_email_otp(&self, email: &str) -> CoreResult<()> {
        Ok(self.auth.send_email_otp(email).await?)
    }

    /// Sends an SMS code.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn send_phone_otp(&self, phone: &str) -> CoreResult<()> {
        Ok(self.auth.send_phone_otp(phone).await?)
    }

    /// Verifies an email code.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn verify_email_otp(&self, email: &str, code: &str) -> CoreResult<UserProfile> {
        Ok(self.auth.verify_email_otp(email, code).await?)
    }

    /// Verifies an SMS code.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn verify_phone_otp(&self, phone: &str, code: &str) -> CoreResult<UserProfile> {
        Ok(self.auth.verify_phone_otp(phone, code).await?)
    }

    /// Signs out and drops the feed's realtime focus.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub async fn sign_out(&self) -> CoreResult<()> {
        self.sessions.set_focused(false);
        Ok(self.auth.sign_out().await?)
    }

    /// Restores the persisted session at app start.
    ///
    /// # Errors
    ///
    /// Storage or transient backend errors.
    pub async fn restore_session(&self) -> CoreResult<Option<UserProfile>> {
        Ok(self.auth.restore_session(Utc::now().timestamp()).await?)
    }

    /// The signed-in user's profile, as last loaded.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.auth.profile().await
    }

    /// Applies a profile edit.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn update_profile(&self, update: ProfileUpdate) -> CoreResult<UserProfile> {
        Ok(self.auth.update_profile(update).await?)
    }

    /// Saves the onboarding answers.
    ///
    /// # Errors
    ///
    /// Validation or backend errors.
    pub async fn complete_onboarding(
        &self,
        display_name: &str,
        university_id: Option<String>,
    ) -> CoreResult<UserProfile> {
        Ok(self
            .auth
            .complete_onboarding(display_name, university_id)
            .await?)
    }

    /// Updates the notification toggles.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn set_notification_preferences(
        &self,
        new_sessions: Option<bool>,
        prayer_reminders: Option<bool>,
    ) -> CoreResult<UserProfile> {
        Ok(self
            .auth
            .set_notification_preferences(new_sessions, prayer_reminders)
            .await?)
    }

    /// Asks for notification permission and stores the device push token.
    ///
    /// Returns `None` when the platform issued no token.
    ///
    /// # Errors
    ///
    /// [`CoreError::PermissionDenied`] when refused, backend errors otherwise.
    pub async fn register_push_token(
        &self,
        notifications: &dyn NotificationProvider,
    ) -> CoreResult<Option<UserProfile>> {
        if !notifications.request_permission().await.is_granted() {
            return Err(CoreError::PermissionDenied("notifications"));
        }
        match notifications.push_token().await {
            Some(token) => Ok(Some(self.auth.set_push_token(&token).await?)),
            None => {
                warn!("Notification permission granted but no push token issued");
                Ok(None)
            }
        }
    }

    // Reference data

    /// Active universities.
    ///
    /// # Errors
    ///
    /// Backend errors when nothing is cached.
    pub async fn universities(&self) -> CoreResult<Vec<University>> {
        Ok(self.directory.universities().await?)
    }

    /// Verified prayer spaces.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn prayer_spaces(&self, university_id: Option<&str>) -> CoreResult<Vec<PrayerSpace>> {
        Ok(self.directory.prayer_spaces(university_id).await?)
    }

    // Location and prayer times

    /// The device position, after checking permission.
    ///
    /// # Errors
    ///
    /// [`CoreError::PermissionDenied`] when location access is refused,
    /// provider errors otherwise.
    pub async fn current_location(&self, provider: &dyn LocationProvider) -> CoreResult<Coordinates> {
        if !provider.request_permission().await.is_granted() {
            return Err(CoreError::PermissionDenied("location"));
        }
        Ok(provider.current_position().await?)
    }

    /// Today's prayer times at `coords`.
    ///
    /// # Errors
    ///
    /// Fetch errors when no cached fallback exists.
    pub async fn prayer_times(&self, coords: Coordinates) -> CoreResult<PrayerTimes> {
        self.prayer_times_at(coords, Local::now().naive_local()).await
    }

    /// Prayer times for the local day of `now`.
    ///
    /// # Errors
    ///
    /// As [`prayer_times`](Self::prayer_times).
    pub async fn prayer_times_at(
        &self,
        coords: Coordinates,
        now: NaiveDateTime,
    ) -> CoreResult<PrayerTimes> {
        Ok(self.prayers.fetch_at(coords, now).await?)
    }

    /// Schedules today's remaining prayer reminders.
    ///
    /// # Errors
    ///
    /// Provider errors.
    pub async fn schedule_prayer_reminders(
        &self,
        notifications: Arc<dyn NotificationProvider>,
        times: &PrayerTimes,
        now: NaiveDateTime,
    ) -> CoreResult<usize> {
        let scheduler =
            PrayerReminderScheduler::new(notifications, self.config.reminders.minutes_before);
        Ok(scheduler.schedule_day(times, now).await?)
    }

    // Feed

    /// Loads sessions around `center`; `radius_m` defaults to the
    /// configured radius.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn fetch_nearby(
        &self,
        center: Coordinates,
        radius_m: Option<u32>,
    ) -> CoreResult<Vec<FeedEntry>> {
        let radius = radius_m.unwrap_or(self.config.feed.default_radius_m);
        Ok(self.sessions.fetch_nearby(center, radius).await?)
    }

    /// Loads the next page.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn load_more(&self) -> CoreResult<Vec<FeedEntry>> {
        Ok(self.sessions.load_more().await?)
    }

    /// Reloads the feed.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn refresh(&self) -> CoreResult<Vec<FeedEntry>> {
        Ok(self.sessions.refresh().await?)
    }

    /// Current feed entries.
    pub async fn feed(&self) -> Vec<FeedEntry> {
        self.sessions.entries().await
    }

    /// Whether the feed can load another page.
    pub async fn has_more(&self) -> bool {
        self.sessions.has_more().await
    }

    /// Attendees of a session.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn attendees(&self, session_id: &str) -> CoreResult<Vec<AttendeeProfile>> {
        Ok(self.sessions.attendees(session_id).await?)
    }

    /// Starts or stops applying realtime events. Regaining focus refreshes
    /// the feed, since events were missed meanwhile.
    ///
    /// # Errors
    ///
    /// Backend errors from the refresh.
    pub async fn set_feed_focused(&self, focused: bool) -> CoreResult<()> {
        if self.sessions.set_focused(focused) {
            match self.sessions.refresh().await {
                Ok(_) | Err(SessionError::NoFeedLocation) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Applies a realtime event, refetching when it cannot be applied
    /// locally.
    pub async fn handle_session_change(&self, change: SessionChange) -> FeedPatch {
        let patch = self.sessions.handle_change(change).await;
        if patch == FeedPatch::RefreshRequired {
            if let Err(e) = self.sessions.refresh().await {
                warn!(error = %e, "Feed refresh after realtime event failed");
            }
        }
        patch
    }

    // Mutations

    /// Creates a session, or queues it when offline.
    ///
    /// The form is validated before queueing so input errors surface
    /// immediately.
    ///
    /// # Errors
    ///
    /// Validation errors, or non-transient backend errors.
    pub async fn create_session(
        &self,
        input: CreateSessionInput,
    ) -> CoreResult<MutationOutcome<PrayerSession>> {
        validate_create_session(&input, Utc::now()).map_err(SessionError::from)?;
        let sessions = Arc::clone(&self.sessions);
        let op_input = input.clone();
        self.mutate(ActionKind::CreateSession(input), || async move {
            sessions.create_session(&op_input).await
        })
        .await
    }

    /// Joins a session, or queues the join when offline.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyJoined`] and other non-transient errors.
    pub async fn join_session(&self, session_id: &str) -> CoreResult<MutationOutcome<()>> {
        let kind = ActionKind::JoinSession {
            session_id: session_id.to_string(),
        };
        self.mutate(kind, || self.sessions.join_session(session_id))
            .await
    }

    /// Leaves a session, or queues the leave when offline.
    ///
    /// # Errors
    ///
    /// Non-transient backend errors.
    pub async fn leave_session(&self, session_id: &str) -> CoreResult<MutationOutcome<()>> {
        let kind = ActionKind::LeaveSession {
            session_id: session_id.to_string(),
        };
        self.mutate(kind, || self.sessions.leave_session(session_id))
            .await
    }

    /// Cancels a session, or queues the cancellation when offline.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotCreator`] and other non-transient errors.
    pub async fn cancel_session(&self, session_id: &str) -> CoreResult<MutationOutcome<()>> {
        let kind = ActionKind::CancelSession {
            session_id: session_id.to_string(),
        };
        self.mutate(kind, || self.sessions.cancel_session(session_id))
            .await
    }

    /// Runs `op` when online; queues `kind` when offline or when `op` fails
    /// for connectivity reasons.
    async fn mutate<T, F, Fut>(&self, kind: ActionKind, op: F) -> CoreResult<MutationOutcome<T>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = SessionResult<T>> + Send,
    {
        if !self.auth.is_signed_in().await {
            return Err(SessionError::NotSignedIn.into());
        }

        if !self.connectivity.is_online() {
            return Ok(MutationOutcome::Queued(self.queue.enqueue(kind)?));
        }

        match op().await {
            Ok(value) => Ok(MutationOutcome::Applied(value)),
            Err(e) if e.is_transient() => {
                warn!(error = %e, action = %kind.describe(), "Request failed offline, queueing");
                Ok(MutationOutcome::Queued(self.queue.enqueue(kind)?))
            }
            Err(e) => Err(e.into()),
        }
    }

    // Offline queue

    /// Records a reachability change; on reconnect, replays the queue and
    /// refreshes the feed.
    ///
    /// Returns the replay summary when a replay ran.
    ///
    /// # Errors
    ///
    /// Storage errors from the queue.
    pub async fn set_connectivity(&self, online: bool) -> CoreResult<Option<QueueSummary>> {
        if !self.connectivity.update(online) {
            return Ok(None);
        }
        self.process_offline_queue().await
    }

    /// Whether the last reachability report was online.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Replays queued actions now.
    ///
    /// Returns `None` when a replay is already running.
    ///
    /// # Errors
    ///
    /// Storage errors from the queue.
    pub async fn process_offline_queue(&self) -> CoreResult<Option<QueueSummary>> {
        let summary = self.queue.process(self.sessions.as_ref()).await?;

        if let Some(summary) = &summary {
            if summary.total() > 0 {
                info!(summary = %summary.message(), "Offline queue drained");
                match self.sessions.refresh().await {
                    Ok(_) | Err(SessionError::NoFeedLocation) => {}
                    Err(e) => warn!(error = %e, "Feed refresh after replay failed"),
                }
            }
        }
        Ok(summary)
    }

    /// Actions waiting for connectivity.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn pending_actions(&self) -> CoreResult<Vec<OfflineAction>> {
        Ok(self.queue.pending()?)
    }
}

impl std::fmt::Debug for JamaatCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JamaatCore")
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}
