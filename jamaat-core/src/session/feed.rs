//! In-memory state of the nearby sessions feed.
//!
//! [`SessionFeed`] is plain data plus the rules for changing it: which
//! sessions are visible, how pagination grows the requested limit,
//! optimistic join/leave with rollback, and patching from realtime events.
//! It performs no I/O; [`SessionStore`](super::SessionStore) drives it.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::types::{FeedEntry, FeedPatch, PrayerSession, SessionChange, SessionLocation};
use crate::location::{calculate_distance, Coordinates};

/// Previous join state of one entry, for undoing an optimistic update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollback {
    session_id: String,
    was_joined: bool,
    attendee_count: u32,
}

impl Rollback {
    /// Session the rollback applies to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// The nearby feed.
#[derive(Debug, Clone)]
pub struct SessionFeed {
    entries: Vec<FeedEntry>,
    center: Option<Coordinates>,
    radius_m: u32,
    pages: u32,
    page_size: u32,
    past_grace: Duration,
    has_more: bool,
    loading: bool,
}

impl SessionFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new(radius_m: u32, page_size: u32, past_grace_minutes: u32) -> Self {
        Self {
            entries: Vec::new(),
            center: None,
            radius_m,
            pages: 1,
            page_size: page_size.max(1),
            past_grace: Duration::minutes(i64::from(past_grace_minutes)),
            has_more: false,
            loading: false,
        }
    }

    /// Visible sessions, soonest first.
    #[must_use]
    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    /// Looks up an entry by session id.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&FeedEntry> {
        self.entries.iter().find(|e| e.id() == session_id)
    }

    fn get_mut(&mut self, session_id: &str) -> Option<&mut FeedEntry> {
        self.entries.iter_mut().find(|e| e.id() == session_id)
    }

    /// Search center, once a fetch has been requested.
    #[must_use]
    pub const fn center(&self) -> Option<Coordinates> {
        self.center
    }

    /// Search radius in meters.
    #[must_use]
    pub const fn radius_m(&self) -> u32 {
        self.radius_m
    }

    /// Whether the last fetch returned a full page.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marks a fetch as started or finished.
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Number of pages currently requested.
    #[must_use]
    pub const fn pages(&self) -> u32 {
        self.pages
    }

    /// Row limit for the radius query: one page per loaded page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.page_size.saturating_mul(self.pages)
    }

    /// Earliest scheduled time still shown at `now`.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.past_grace
    }

    /// Points the feed at a new center and radius and resets pagination.
    pub fn set_query(&mut self, center: Coordinates, radius_m: u32) {
        if self.center != Some(center) || self.radius_m != radius_m {
            self.entries.clear();
        }
        self.center = Some(center);
        self.radius_m = radius_m;
        self.pages = 1;
        self.has_more = false;
    }

    /// Requests one more page. Returns `false` when there is nothing more.
    pub fn next_page(&mut self) -> bool {
        if !self.has_more {
            return false;
        }
        self.pages = self.pages.saturating_add(1);
        true
    }

    /// Undoes [`next_page`](Self::next_page) after a failed fetch.
    pub fn previous_page(&mut self) {
        self.pages = self.pages.saturating_sub(1).max(1);
    }

    fn is_visible(&self, session: &PrayerSession, now: DateTime<Utc>) -> bool {
        !session.is_cancelled && session.scheduled_time >= self.window_start(now)
    }

    /// Replaces the entries with a fresh query result.
    ///
    /// `has_more` is set when the backend filled the whole `limit`;
    /// cancelled and expired sessions are dropped.
    pub fn replace(&mut self, entries: Vec<FeedEntry>, limit: u32, now: DateTime<Utc>) {
        let returned = entries.len();
        self.has_more = u32::try_from(returned).map_or(true, |n| n >= limit);

        let mut visible: Vec<FeedEntry> = entries
            .into_iter()
            .filter(|e| self.is_visible(&e.session, now))
            .collect();
        visible.sort_by(|a, b| a.session.scheduled_time.cmp(&b.session.scheduled_time));

        debug!(
            returned,
            visible = visible.len(),
            has_more = self.has_more,
            "Feed replaced"
        );
        self.entries = visible;
    }

    /// Drops sessions that have moved out of the time window.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let start = self.window_start(now);
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.session.is_cancelled && e.session.scheduled_time >= start);
        before - self.entries.len()
    }

    /// Removes a session. Returns whether it was present.
    pub fn remove(&mut self, session_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id() != session_id);
        before != self.entries.len()
    }

    /// Marks the session joined and bumps its count.
    ///
    /// Returns `None` if the session is not in the feed or already joined.
    pub fn apply_optimistic_join(&mut self, session_id: &str) -> Option<Rollback> {
        let entry = self.get_mut(session_id)?;
        if entry.is_joined {
            return None;
        }
        let rollback = Rollback {
            session_id: session_id.to_string(),
            was_joined: entry.is_joined,
            attendee_count: entry.attendee_count,
        };
        entry.is_joined = true;
        entry.attendee_count = entry.attendee_count.saturating_add(1);
        Some(rollback)
    }

    /// Marks the session left and lowers its count.
    ///
    /// Returns `None` if the session is not in the feed or not joined.
    pub fn apply_optimistic_leave(&mut self, session_id: &str) -> Option<Rollback> {
        let entry = self.get_mut(session_id)?;
        if !entry.is_joined {
            return None;
        }
        let rollback = Rollback {
            session_id: session_id.to_string(),
            was_joined: entry.is_joined,
            attendee_count: entry.attendee_count,
        };
        entry.is_joined = false;
        entry.attendee_count = entry.attendee_count.saturating_sub(1);
        Some(rollback)
    }

    /// Restores the state captured by an optimistic update.
    pub fn rollback(&mut self, rollback: Rollback) {
        if let Some(entry) = self.get_mut(&rollback.session_id) {
            entry.is_joined = rollback.was_joined;
            entry.attendee_count = rollback.attendee_count;
        }
    }

    /// Marks a session as joined without touching its count.
    pub fn mark_joined(&mut self, session_id: &str) {
        if let Some(entry) = self.get_mut(session_id) {
            entry.is_joined = true;
        }
    }

    /// Applies a realtime change at `now`.
    ///
    /// `current_user` is ignored for attendee events, whose effect the
    /// optimistic update already applied.
    pub fn apply_change(
        &mut self,
        change: SessionChange,
        current_user: Option<&str>,
        now: DateTime<Utc>,
    ) -> FeedPatch {
        match change {
            SessionChange::SessionInserted { row } => {
                if self.get(&row.id).is_some() {
                    return FeedPatch::Ignored;
                }
                let session = match PrayerSession::try_from(row) {
                    Ok(session) => session,
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed realtime insert");
                        return FeedPatch::Ignored;
                    }
                };
                self.insert_session(session, now)
            }
            SessionChange::SessionUpdated { row } => {
                let Some(index) = self.entries.iter().position(|e| e.id() == row.id) else {
                    return FeedPatch::Ignored;
                };
                if row.is_cancelled {
                    self.entries.remove(index);
                    return FeedPatch::Applied;
                }
                match PrayerSession::try_from(row) {
                    Ok(session) => {
                        let location_changed =
                            self.entries[index].session.location != session.location;
                        self.entries[index].session = session;
                        if location_changed {
                            return FeedPatch::RefreshRequired;
                        }
                        self.prune_expired(now);
                        self.entries
                            .sort_by(|a, b| a.session.scheduled_time.cmp(&b.session.scheduled_time));
                        FeedPatch::Applied
                    }
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed realtime update");
                        FeedPatch::Ignored
                    }
                }
            }
            SessionChange::SessionDeleted { id } => {
                if self.remove(&id) {
                    FeedPatch::Applied
                } else {
                    FeedPatch::Ignored
                }
            }
            SessionChange::AttendeeJoined {
                session_id,
                user_id,
            } => {
                if current_user == Some(user_id.as_str()) {
                    return FeedPatch::Ignored;
                }
                match self.get_mut(&session_id) {
                    Some(entry) => {
                        entry.attendee_count = entry.attendee_count.saturating_add(1);
                        FeedPatch::Applied
                    }
                    None => FeedPatch::Ignored,
                }
            }
            SessionChange::AttendeeLeft {
                session_id,
                user_id,
            } => {
                if current_user == Some(user_id.as_str()) {
                    return FeedPatch::Ignored;
                }
                match self.get_mut(&session_id) {
                    Some(entry) => {
                        entry.attendee_count = entry.attendee_count.saturating_sub(1);
                        FeedPatch::Applied
                    }
                    None => FeedPatch::Ignored,
                }
            }
        }
    }

    /// Adds a newly created session if it falls inside the feed's radius
    /// and time window.
    ///
    /// Sessions at a prayer space need the backend to compute their
    /// distance, so they yield [`FeedPatch::RefreshRequired`].
    pub fn insert_session(&mut self, session: PrayerSession, now: DateTime<Utc>) -> FeedPatch {
        let Some(center) = self.center else {
            return FeedPatch::Ignored;
        };
        if !self.is_visible(&session, now) {
            return FeedPatch::Ignored;
        }

        let coords = match &session.location {
            SessionLocation::PrayerSpace { .. } => return FeedPatch::RefreshRequired,
            SessionLocation::Custom { .. } => session.location.coordinates(),
        };
        let Some(coords) = coords else {
            return FeedPatch::Ignored;
        };

        let distance = calculate_distance(&center, &coords);
        if distance > f64::from(self.radius_m) {
            return FeedPatch::Ignored;
        }

        let entry = FeedEntry {
            session,
            prayer_space_name: None,
            creator_name: None,
            distance_meters: distance,
            attendee_count: 0,
            is_joined: false,
        };
        let at = self
            .entries
            .partition_point(|e| e.session.scheduled_time <= entry.session.scheduled_time);
        self.entries.insert(at, entry);
        FeedPatch::Applied
    }
}
