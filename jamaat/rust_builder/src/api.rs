//! API bridging layer that exposes jamaat-core functionality.
//!
//! Domain values cross the bridge as opaque handles with sync getters;
//! errors cross as the user-facing message from [`CoreError::user_message`].

use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime, TimeZone};
use flutter_rust_bridge::frb;
use jamaat_core::auth::{ProfileUpdate, UserProfile};
use jamaat_core::clock::format_time_12h;
use jamaat_core::location::{format_distance, Coordinates};
use jamaat_core::platform::{LocalNotification, NotificationProvider};
use jamaat_core::prayer::{
    get_current_prayer, get_next_prayer, suggest_prayer_time, PrayerName, PrayerTimes,
};
use jamaat_core::session::{CreateSessionInput, FeedEntry, FeedPatch, SessionChange};
use jamaat_core::{CoreConfig, CoreError, MutationOutcome};

use crate::keystore::register_native_store;
use crate::notifications::{CollectedReminders, ReportedPush};

fn user_error(err: CoreError) -> String {
    log::warn!("Core operation failed ({:?}): {err}", err.kind());
    err.user_message()
}

fn coordinates(latitude: f64, longitude: f64) -> Result<Coordinates, String> {
    Coordinates::new(latitude, longitude).map_err(|e| user_error(e.into()))
}

fn unix_seconds(local: NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(&local)
        .earliest()
        .map_or_else(|| local.and_utc().timestamp(), |t| t.timestamp())
}

/// Whether a mutation reached the server or waits in the offline queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Applied,
    Queued,
}

impl<T> From<&MutationOutcome<T>> for MutationStatus {
    fn from(outcome: &MutationOutcome<T>) -> Self {
        if outcome.is_queued() {
            Self::Queued
        } else {
            Self::Applied
        }
    }
}

/// A university for the onboarding picker.
#[derive(Debug, Clone)]
pub struct UniversityItem {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A verified prayer space.
#[derive(Debug, Clone)]
pub struct PrayerSpaceItem {
    pub id: String,
    pub name: String,
    pub university_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
}

/// Someone who joined a session.
#[derive(Debug, Clone)]
pub struct AttendeeItem {
    pub user_id: String,
    pub display_name: Option<String>,
    /// Unix timestamp (seconds since epoch).
    pub joined_at: i64,
}

/// A prayer reminder for the app to schedule.
#[derive(Debug, Clone)]
pub struct ReminderItem {
    /// Stable id; scheduling the same id again replaces the reminder.
    pub id: String,
    pub title: String,
    pub body: String,
    /// Unix timestamp (seconds since epoch).
    pub fire_at: i64,
}

impl From<LocalNotification> for ReminderItem {
    fn from(n: LocalNotification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            body: n.body,
            fire_at: unix_seconds(n.fire_at),
        }
    }
}

/// Core interface for Jamaat functionality (wrapper around jamaat-core).
#[derive(Debug)]
#[frb(opaque)]
pub struct JamaatCore {
    inner: Arc<jamaat_core::JamaatCore>,
}

impl JamaatCore {
    /// Opens the core with a JSON config, storing data under `data_dir`.
    ///
    /// # Errors
    ///
    /// Invalid config or an unusable data directory.
    pub fn new(config_json: String, data_dir: String) -> Result<Self, String> {
        let config = CoreConfig::from_json(&config_json).map_err(|e| user_error(e.into()))?;
        jamaat_core::logging::init_logging(&config.log_filter);
        register_native_store();

        let inner = jamaat_core::JamaatCore::with_http_clients(config, Path::new(&data_dir))
            .map_err(user_error)?;
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns whether the last reachability report was online.
    #[frb(sync)]
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.inner.is_online()
    }

    // Auth

    pub async fn sign_in(&self, email: String, password: String) -> Result<Profile, String> {
        self.inner
            .sign_in(&email, &password)
            .await
            .map(Profile::from)
            .map_err(user_error)
    }

    /// Returns `true` when signed in immediately, `false` when the email
    /// must be confirmed first.
    pub async fn sign_up(&self, email: String, password: String) -> Result<bool, String> {
        self.inner
            .sign_up(&email, &password)
            .await
            .map(|outcome| matches!(outcome, jamaat_core::auth::SignUpOutcome::SignedIn(_)))
            .map_err(user_error)
    }

    pub async fn send_email_otp(&self, email: String) -> Result<(), String> {
        self.inner.send_email_otp(&email).await.map_err(user_error)
    }

    pub async fn send_phone_otp(&self, phone: String) -> Result<(), String> {
        self.inner.send_phone_otp(&phone).await.map_err(user_error)
    }

    pub async fn verify_email_otp(&self, email: String, code: String) -> Result<Profile, String> {
        self.inner
            .verify_email_otp(&email, &code)
            .await
            .map(Profile::from)
            .map_err(user_error)
    }

    pub async fn verify_phone_otp(&self, phone: String, code: String) -> Result<Profile, String> {
        self.inner
            .verify_phone_otp(&phone, &code)
            .await
            .map(Profile::from)
            .map_err(user_error)
    }

    pub async fn sign_out(&self) -> Result<(), String> {
        self.inner.sign_out().await.map_err(user_error)
    }

    /// Restores the stored session; `None` means show the sign-in screen.
    pub async fn restore_session(&self) -> Result<Option<Profile>, String> {
        self.inner
            .restore_session()
            .await
            .map(|profile| profile.map(Profile::from))
            .map_err(user_error)
    }

    pub async fn complete_onboarding(
        &self,
        display_name: String,
        university_id: Option<String>,
    ) -> Result<Profile, String> {
        self.inner
            .complete_onboarding(&display_name, university_id)
            .await
            .map(Profile::from)
            .map_err(user_error)
    }

    pub async fn update_profile(
        &self,
        display_name: Option<String>,
        university_id: Option<String>,
    ) -> Result<Profile, String> {
        let update = ProfileUpdate {
            display_name,
            university_id,
            ..ProfileUpdate::default()
        };
        self.inner
            .update_profile(update)
            .await
            .map(Profile::from)
            .map_err(user_error)
    }

    /// Stores the push token the app obtained after asking for permission.
    ///
    /// Returns `None` when permission was granted but no token was issued.
    pub async fn register_push_token(
        &self,
        permission_granted: bool,
        token: Option<String>,
    ) -> Result<Option<Profile>, String> {
        let reported = ReportedPush {
            granted: permission_granted,
            token,
        };
        self.inner
            .register_push_token(&reported)
            .await
            .map(|profile| profile.map(Profile::from))
            .map_err(user_error)
    }

    pub async fn set_notification_preferences(
        &self,
        new_sessions: Option<bool>,
        prayer_reminders: Option<bool>,
    ) -> Result<Profile, String> {
        self.inner
            .set_notification_preferences(new_sessions, prayer_reminders)
            .await
            .map(Profile::from)
            .map_err(user_error)
    }

    // Reference data

    pub async fn universities(&self) -> Result<Vec<UniversityItem>, String> {
        let universities = self.inner.universities().await.map_err(user_error)?;
        Ok(universities
            .into_iter()
            .map(|u| UniversityItem {
                id: u.id,
                name: u.name,
                latitude: u.latitude,
                longitude: u.longitude,
            })
            .collect())
    }

    pub async fn prayer_spaces(
        &self,
        university_id: Option<String>,
    ) -> Result<Vec<PrayerSpaceItem>, String> {
        let spaces = self
            .inner
            .prayer_spaces(university_id.as_deref())
            .await
            .map_err(user_error)?;
        Ok(spaces
            .into_iter()
            .map(|s| PrayerSpaceItem {
                id: s.id,
                name: s.name,
                university_id: s.university_id,
                latitude: s.latitude,
                longitude: s.longitude,
                description: s.description,
            })
            .collect())
    }

    pub async fn prayer_times(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<DailyPrayerTimes, String> {
        let coords = coordinates(latitude, longitude)?;
        self.inner
            .prayer_times(coords)
            .await
            .map(|inner| DailyPrayerTimes { inner })
            .map_err(user_error)
    }

    /// Today's remaining prayer reminders. The app cancels the reminders
    /// it scheduled before and schedules these.
    pub async fn schedule_prayer_reminders(
        &self,
        times: &DailyPrayerTimes,
    ) -> Result<Vec<ReminderItem>, String> {
        let collected = Arc::new(CollectedReminders::default());
        self.inner
            .schedule_prayer_reminders(
                Arc::clone(&collected) as Arc<dyn NotificationProvider>,
                &times.inner,
                Local::now().naive_local(),
            )
            .await
            .map_err(user_error)?;
        Ok(collected.take().into_iter().map(ReminderItem::from).collect())
    }

    // Feed

    pub async fn fetch_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: Option<u32>,
    ) -> Result<Vec<FeedItem>, String> {
        let coords = coordinates(latitude, longitude)?;
        self.inner
            .fetch_nearby(coords, radius_m)
            .await
            .map(FeedItem::wrap_all)
            .map_err(user_error)
    }

    pub async fn load_more(&self) -> Result<Vec<FeedItem>, String> {
        self.inner
            .load_more()
            .await
            .map(FeedItem::wrap_all)
            .map_err(user_error)
    }

    pub async fn refresh(&self) -> Result<Vec<FeedItem>, String> {
        self.inner
            .refresh()
            .await
            .map(FeedItem::wrap_all)
            .map_err(user_error)
    }

    pub async fn feed(&self) -> Vec<FeedItem> {
        FeedItem::wrap_all(self.inner.feed().await)
    }

    pub async fn has_more(&self) -> bool {
        self.inner.has_more().await
    }

    pub async fn attendees(&self, session_id: String) -> Result<Vec<AttendeeItem>, String> {
        let attendees = self.inner.attendees(&session_id).await.map_err(user_error)?;
        Ok(attendees
            .into_iter()
            .map(|a| AttendeeItem {
                user_id: a.user_id,
                display_name: a.display_name,
                joined_at: a.joined_at.timestamp(),
            })
            .collect())
    }

    pub async fn set_feed_focused(&self, focused: bool) -> Result<(), String> {
        self.inner
            .set_feed_focused(focused)
            .await
            .map_err(user_error)
    }

    /// Applies a realtime payload. Returns `true` when the feed changed.
    ///
    /// # Errors
    ///
    /// The payload is not a recognised change event.
    pub async fn handle_session_change(&self, event_json: String) -> Result<bool, String> {
        let change: SessionChange = serde_json::from_str(&event_json).map_err(|e| {
            log::warn!("Unrecognised realtime payload: {e}");
            "Unrecognised realtime event".to_string()
        })?;
        let patch = self.inner.handle_session_change(change).await;
        Ok(patch != FeedPatch::Ignored)
    }

    // Mutations

    /// Creates a session from the form JSON.
    pub async fn create_session(&self, input_json: String) -> Result<MutationStatus, String> {
        let input: CreateSessionInput = serde_json::from_str(&input_json).map_err(|e| {
            log::warn!("Malformed create-session form: {e}");
            "Please check the highlighted fields.".to_string()
        })?;
        self.inner
            .create_session(input)
            .await
            .map(|outcome| MutationStatus::from(&outcome))
            .map_err(user_error)
    }

    pub async fn join_session(&self, session_id: String) -> Result<MutationStatus, String> {
        self.inner
            .join_session(&session_id)
            .await
            .map(|outcome| MutationStatus::from(&outcome))
            .map_err(user_error)
    }

    pub async fn leave_session(&self, session_id: String) -> Result<MutationStatus, String> {
        self.inner
            .leave_session(&session_id)
            .await
            .map(|outcome| MutationStatus::from(&outcome))
            .map_err(user_error)
    }

    pub async fn cancel_session(&self, session_id: String) -> Result<MutationStatus, String> {
        self.inner
            .cancel_session(&session_id)
            .await
            .map(|outcome| MutationStatus::from(&outcome))
            .map_err(user_error)
    }

    /// Reports reachability. On reconnect the offline queue is replayed and
    /// the toast text is returned.
    pub async fn set_connectivity(&self, online: bool) -> Result<Option<String>, String> {
        self.inner
            .set_connectivity(online)
            .await
            .map(|summary| summary.filter(|s| s.total() > 0).map(|s| s.message()))
            .map_err(user_error)
    }
}

/// The signed-in user's profile (FFI wrapper).
#[derive(Debug, Clone)]
#[frb(opaque)]
pub struct Profile {
    inner: UserProfile,
}

impl From<UserProfile> for Profile {
    fn from(inner: UserProfile) -> Self {
        Self { inner }
    }
}

impl Profile {
    #[frb(sync)]
    #[must_use]
    pub fn id(&self) -> String {
        self.inner.id.clone()
    }

    #[frb(sync)]
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        self.inner.display_name.clone()
    }

    #[frb(sync)]
    #[must_use]
    pub fn university_id(&self) -> Option<String> {
        self.inner.university_id.clone()
    }

    /// Whether onboarding still needs to run.
    #[frb(sync)]
    #[must_use]
    pub fn needs_onboarding(&self) -> bool {
        !self.inner.onboarding_completed
    }

    #[frb(sync)]
    #[must_use]
    pub fn notify_new_sessions(&self) -> bool {
        self.inner.notify_new_sessions
    }

    #[frb(sync)]
    #[must_use]
    pub fn notify_prayer_reminders(&self) -> bool {
        self.inner.notify_prayer_reminders
    }
}

/// A nearby session card (FFI wrapper).
#[derive(Debug, Clone)]
#[frb(opaque)]
pub struct FeedItem {
    inner: FeedEntry,
}

impl FeedItem {
    fn wrap_all(entries: Vec<FeedEntry>) -> Vec<Self> {
        entries.into_iter().map(|inner| Self { inner }).collect()
    }

    #[frb(sync)]
    #[must_use]
    pub fn id(&self) -> String {
        self.inner.id().to_string()
    }

    /// Prayer display name, e.g. "Maghrib".
    #[frb(sync)]
    #[must_use]
    pub fn prayer_name(&self) -> String {
        self.inner.session.prayer_type.display_name().to_string()
    }

    /// Start time as Unix timestamp (seconds since epoch).
    #[frb(sync)]
    #[must_use]
    pub fn scheduled_time(&self) -> i64 {
        self.inner.session.scheduled_time.timestamp()
    }

    #[frb(sync)]
    #[must_use]
    pub fn location_label(&self) -> String {
        self.inner.location_label().to_string()
    }

    /// Distance from the feed center, e.g. "350 m" or "1.2 km".
    #[frb(sync)]
    #[must_use]
    pub fn distance_label(&self) -> String {
        format_distance(self.inner.distance_meters)
    }

    #[frb(sync)]
    #[must_use]
    pub fn attendee_count(&self) -> u32 {
        self.inner.attendee_count
    }

    #[frb(sync)]
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.inner.is_joined
    }

    #[frb(sync)]
    #[must_use]
    pub fn creator_id(&self) -> String {
        self.inner.session.created_by.clone()
    }

    #[frb(sync)]
    #[must_use]
    pub fn creator_name(&self) -> Option<String> {
        self.inner.creator_name.clone()
    }

    #[frb(sync)]
    #[must_use]
    pub fn notes(&self) -> Option<String> {
        self.inner.session.notes.clone()
    }
}

/// Today's prayer times (FFI wrapper).
#[derive(Debug, Clone)]
#[frb(opaque)]
pub struct DailyPrayerTimes {
    inner: PrayerTimes,
}

impl DailyPrayerTimes {
    /// Display rows as `(name, "h:mm AM")` pairs in daily order.
    #[frb(sync)]
    #[must_use]
    pub fn rows(&self) -> Vec<(String, String)> {
        self.inner
            .entries()
            .iter()
            .map(|(name, time)| (name.display_name().to_string(), format_time_12h(*time)))
            .collect()
    }

    #[frb(sync)]
    #[must_use]
    pub fn current_prayer(&self) -> String {
        get_current_prayer(&self.inner).name.display_name().to_string()
    }

    #[frb(sync)]
    #[must_use]
    pub fn next_prayer(&self) -> String {
        get_next_prayer(&self.inner).name.display_name().to_string()
    }

    /// Countdown to the next prayer, e.g. "1h 20m".
    #[frb(sync)]
    #[must_use]
    pub fn time_until_next(&self) -> String {
        get_next_prayer(&self.inner).time_until
    }

    /// Suggested start for a new session of `prayer` (e.g. "asr"), as a
    /// Unix timestamp. `None` for an unknown prayer name.
    #[frb(sync)]
    #[must_use]
    pub fn suggest_time(&self, prayer: String) -> Option<i64> {
        let name = PrayerName::parse(&prayer.to_lowercase())?;
        Some(unix_seconds(suggest_prayer_time(&self.inner, name)))
    }
}
