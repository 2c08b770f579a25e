//! Session store: feed loading, session mutations, realtime patching.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::{SessionError, SessionResult};
use super::feed::SessionFeed;
use super::types::{
    AttendeeProfile, CreateSessionInput, FeedEntry, FeedPatch, PrayerSession, SessionChange,
};
use super::validation::validate_create_session;
use crate::auth::AuthStore;
use crate::backend::{Backend, BackendError, RadiusQuery};
use crate::config::FeedConfig;
use crate::location::Coordinates;

/// Loads the nearby feed and applies session and attendance changes.
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    auth: Arc<AuthStore>,
    feed: RwLock<SessionFeed>,
    focused: AtomicBool,
}

impl SessionStore {
    /// Creates a store with an empty feed.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, auth: Arc<AuthStore>, config: &FeedConfig) -> Self {
        Self {
            backend,
            auth,
            feed: RwLock::new(SessionFeed::new(
                config.default_radius_m,
                config.page_size,
                config.past_grace_minutes,
            )),
            focused: AtomicBool::new(false),
        }
    }

    async fn user_id(&self) -> SessionResult<String> {
        Ok(self.auth.authorized().await?)
    }

    /// Snapshot of the visible sessions.
    pub async fn entries(&self) -> Vec<FeedEntry> {
        self.feed.read().await.entries().to_vec()
    }

    /// Snapshot of one session in the feed.
    pub async fn entry(&self, session_id: &str) -> Option<FeedEntry> {
        self.feed.read().await.get(session_id).cloned()
    }

    /// Whether another page may exist.
    pub async fn has_more(&self) -> bool {
        self.feed.read().await.has_more()
    }

    /// Whether a fetch is in flight.
    pub async fn is_loading(&self) -> bool {
        self.feed.read().await.is_loading()
    }

    /// Current search radius.
    pub async fn radius_m(&self) -> u32 {
        self.feed.read().await.radius_m()
    }

    /// Loads the first page of sessions around `center`.
    ///
    /// # Errors
    ///
    /// Backend errors; the previous entries are kept on failure.
    pub async fn fetch_nearby(
        &self,
        center: Coordinates,
        radius_m: u32,
    ) -> SessionResult<Vec<FeedEntry>> {
        self.fetch_nearby_at(center, radius_m, Utc::now()).await
    }

    /// [`fetch_nearby`](Self::fetch_nearby) at an explicit `now`.
    ///
    /// # Errors
    ///
    /// As [`fetch_nearby`](Self::fetch_nearby).
    pub async fn fetch_nearby_at(
        &self,
        center: Coordinates,
        radius_m: u32,
        now: DateTime<Utc>,
    ) -> SessionResult<Vec<FeedEntry>> {
        self.feed.write().await.set_query(center, radius_m);
        self.load(now).await
    }

    /// Extends the feed by one page.
    ///
    /// # Errors
    ///
    /// [`SessionError::NoFeedLocation`] before the first fetch, backend
    /// errors otherwise.
    pub async fn load_more(&self) -> SessionResult<Vec<FeedEntry>> {
        self.load_more_at(Utc::now()).await
    }

    /// [`load_more`](Self::load_more) at an explicit `now`.
    ///
    /// # Errors
    ///
    /// As [`load_more`](Self::load_more).
    pub async fn load_more_at(&self, now: DateTime<Utc>) -> SessionResult<Vec<FeedEntry>> {
        {
            let mut feed = self.feed.write().await;
            if feed.center().is_none() {
                return Err(SessionError::NoFeedLocation);
            }
            if feed.is_loading() || !feed.next_page() {
                return Ok(feed.entries().to_vec());
            }
        }

        let result = self.load(now).await;
        if result.is_err() {
            self.feed.write().await.previous_page();
        }
        result
    }

    /// Reloads every loaded page.
    ///
    /// # Errors
    ///
    /// As [`load_more`](Self::load_more).
    pub async fn refresh(&self) -> SessionResult<Vec<FeedEntry>> {
        self.refresh_at(Utc::now()).await
    }

    /// [`refresh`](Self::refresh) at an explicit `now`.
    ///
    /// # Errors
    ///
    /// As [`load_more`](Self::load_more).
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> SessionResult<Vec<FeedEntry>> {
        if self.feed.read().await.center().is_none() {
            return Err(SessionError::NoFeedLocation);
        }
        self.load(now).await
    }

    /// Runs the radius query for the feed's current center, radius and
    /// limit and replaces the entries. Concurrent loads are last-write-wins.
    async fn load(&self, now: DateTime<Utc>) -> SessionResult<Vec<FeedEntry>> {
        let query = {
            let mut feed = self.feed.write().await;
            let center = feed.center().ok_or(SessionError::NoFeedLocation)?;
            feed.set_loading(true);
            RadiusQuery {
                lat: center.latitude,
                lng: center.longitude,
                radius_meters: feed.radius_m(),
                from_time: feed.window_start(now),
                limit: feed.limit(),
            }
        };

        let result = self.query_entries(&query).await;

        let mut feed = self.feed.write().await;
        feed.set_loading(false);
        let entries = result?;
        feed.replace(entries, query.limit, now);
        Ok(feed.entries().to_vec())
    }

    async fn query_entries(&self, query: &RadiusQuery) -> SessionResult<Vec<FeedEntry>> {
        let rows = self.backend.sessions_within_radius(query).await?;
        let mut entries: Vec<FeedEntry> = rows
            .into_iter()
            .filter_map(|row| match FeedEntry::try_from(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed session row");
                    None
                }
            })
            .collect();

        if let Some(user_id) = self.auth.authorized_if_signed_in().await? {
            let ids: Vec<String> = entries.iter().map(|e| e.id().to_string()).collect();
            let joined: HashSet<String> = self
                .backend
                .joined_session_ids(&user_id, &ids)
                .await?
                .into_iter()
                .collect();
            for entry in &mut entries {
                entry.is_joined = joined.contains(entry.id());
            }
        }

        debug!(
            count = entries.len(),
            radius_m = query.radius_meters,
            "Fetched nearby sessions"
        );
        Ok(entries)
    }

    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Validation errors, [`SessionError::NotSignedIn`], or backend errors.
    pub async fn create_session(&self, input: &CreateSessionInput) -> SessionResult<PrayerSession> {
        self.create_session_at(input, Utc::now()).await
    }

    /// [`create_session`](Self::create_session) validated at an explicit `now`.
    ///
    /// # Errors
    ///
    /// As [`create_session`](Self::create_session).
    pub async fn create_session_at(
        &self,
        input: &CreateSessionInput,
        now: DateTime<Utc>,
    ) -> SessionResult<PrayerSession> {
        let valid = validate_create_session(input, now)?;
        let user_id = self.user_id().await?;

        let row = self.backend.insert_session(&valid.into_row(&user_id)).await?;
        let session = PrayerSession::try_from(row)?;
        info!(session_id = %session.id, prayer = %session.prayer_type, "Session created");

        let patch = self
            .feed
            .write()
            .await
            .insert_session(session.clone(), now);
        if patch == FeedPatch::RefreshRequired {
            if let Err(e) = self.load(now).await {
                warn!(error = %e, "Feed refresh after create failed");
            }
        }

        Ok(session)
    }

    /// Joins a session, updating the feed optimistically.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyJoined`] when the backend already has the
    /// attendance (the entry stays joined), other backend errors after
    /// rolling the entry back.
    pub async fn join_session(&self, session_id: &str) -> SessionResult<()> {
        let user_id = self.user_id().await?;
        let rollback = self.feed.write().await.apply_optimistic_join(session_id);

        match self.backend.insert_attendee(session_id, &user_id).await {
            Ok(_) => {
                info!(session_id, "Joined session");
                Ok(())
            }
            Err(BackendError::Conflict(_)) => {
                let mut feed = self.feed.write().await;
                if let Some(rollback) = rollback {
                    feed.rollback(rollback);
                }
                feed.mark_joined(session_id);
                debug!(session_id, "Already joined");
                Err(SessionError::AlreadyJoined(session_id.to_string()))
            }
            Err(e) => {
                if let Some(rollback) = rollback {
                    self.feed.write().await.rollback(rollback);
                }
                warn!(session_id, error = %e, "Join failed");
                Err(e.into())
            }
        }
    }

    /// Leaves a session, updating the feed optimistically.
    ///
    /// # Errors
    ///
    /// Backend errors after rolling the entry back.
    pub async fn leave_session(&self, session_id: &str) -> SessionResult<()> {
        let user_id = self.user_id().await?;
        let rollback = self.feed.write().await.apply_optimistic_leave(session_id);

        match self.backend.delete_attendee(session_id, &user_id).await {
            Ok(()) => {
                info!(session_id, "Left session");
                Ok(())
            }
            Err(e) => {
                if let Some(rollback) = rollback {
                    self.feed.write().await.rollback(rollback);
                }
                warn!(session_id, error = %e, "Leave failed");
                Err(e.into())
            }
        }
    }

    /// Cancels a session the current user created.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotCreator`] when the feed shows another creator,
    /// backend errors otherwise.
    pub async fn cancel_session(&self, session_id: &str) -> SessionResult<()> {
        let user_id = self.user_id().await?;
        let creator = self
            .feed
            .read()
            .await
            .get(session_id)
            .map(|e| e.session.created_by.clone());
        if creator.is_some_and(|c| c != user_id) {
            return Err(SessionError::NotCreator(session_id.to_string()));
        }

        self.backend.cancel_session(session_id).await?;
        self.feed.write().await.remove(session_id);
        info!(session_id, "Session cancelled");
        Ok(())
    }

    /// Attendees of a session, earliest first.
    ///
    /// # Errors
    ///
    /// Backend errors, including a decode error for a malformed embed.
    pub async fn attendees(&self, session_id: &str) -> SessionResult<Vec<AttendeeProfile>> {
        self.auth.authorized_if_signed_in().await?;
        let rows = self.backend.fetch_attendees(session_id).await?;
        Ok(rows.into_iter().map(AttendeeProfile::from).collect())
    }

    /// Ties the realtime subscription to screen focus.
    ///
    /// Returns `true` when focus was regained, meaning events may have been
    /// missed and the feed should be refreshed.
    pub fn set_focused(&self, focused: bool) -> bool {
        let was = self.focused.swap(focused, Ordering::SeqCst);
        if was != focused {
            debug!(focused, "Feed subscription toggled");
        }
        focused && !was
    }

    /// Whether realtime events are currently applied.
    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    /// Applies a realtime change if the feed is focused.
    pub async fn handle_change(&self, change: SessionChange) -> FeedPatch {
        self.handle_change_at(change, Utc::now()).await
    }

    /// [`handle_change`](Self::handle_change) at an explicit `now`.
    pub async fn handle_change_at(&self, change: SessionChange, now: DateTime<Utc>) -> FeedPatch {
        if !self.is_focused() {
            return FeedPatch::Ignored;
        }
        let user_id = self.auth.current_user_id().await;
        let patch = self
            .feed
            .write()
            .await
            .apply_change(change, user_id.as_deref(), now);
        debug!(?patch, "Realtime change handled");
        patch
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("focused", &self.is_focused())
            .finish_non_exhaustive()
    }
}
