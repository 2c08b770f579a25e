//! Reusable fakes for integration tests.
//!
//! `FakeBackend` keeps users, sessions and attendees in memory and answers
//! the radius query the way the hosted RPC does. Connectivity loss is
//! simulated with [`FakeBackend::set_offline`]. Writes are rejected with
//! 401 unless the current access token is unexpired, like the hosted
//! row-level security. No network is touched.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use jamaat_core::auth::{
    AuthSession, AuthUser, OtpTarget, ProfileUpdate, SecretToken, SignUpResponse, UserProfile,
};
use jamaat_core::backend::{
    AttendeeRecordRow, AttendeeRow, AttendeeUserRow, Backend, BackendError, BackendResult,
    NearbySessionRow, NewSessionRow, RadiusQuery, SessionRow,
};
use jamaat_core::location::{calculate_distance, Coordinates};
use jamaat_core::platform::{
    LocalNotification, LocationProvider, NotificationProvider, PermissionStatus, PlatformResult,
};
use jamaat_core::prayer::{PrayerError, PrayerResult, PrayerTimes, PrayerTimesApi};
use jamaat_core::session::{CreateSessionInput, LocationType};
use jamaat_core::university::{PrayerSpace, University};
use jamaat_core::{CoreConfig, JamaatCore};

/// Campus center used by most tests (Toronto).
pub const CAMPUS: Coordinates = Coordinates::new_unchecked(43.6629, -79.3957);

/// Password accepted by [`FakeBackend`] for every account.
pub const PASSWORD: &str = "correct horse";

/// One-time code accepted by [`FakeBackend`].
pub const OTP_CODE: &str = "123456";

pub fn config() -> CoreConfig {
    CoreConfig::new("https://demo.supabase.co", "anon-key")
}

/// A point roughly `meters` north of [`CAMPUS`].
pub fn north_of_campus(meters: f64) -> Coordinates {
    Coordinates::new_unchecked(CAMPUS.latitude + meters / 111_195.0, CAMPUS.longitude)
}

/// In-memory backend.
#[derive(Default)]
pub struct FakeBackend {
    offline: AtomicBool,
    reject_refresh: AtomicBool,
    require_confirmation: AtomicBool,
    token_ttl_secs: AtomicI64,
    next_id: AtomicU64,
    refreshes: AtomicUsize,
    access_token: Mutex<Option<String>>,
    token_expiries: Mutex<HashMap<String, i64>>,
    accounts: Mutex<HashMap<String, String>>,
    users: Mutex<HashMap<String, UserProfile>>,
    universities: Mutex<Vec<University>>,
    spaces: Mutex<Vec<PrayerSpace>>,
    sessions: Mutex<Vec<SessionRow>>,
    attendees: Mutex<Vec<AttendeeRecordRow>>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.token_ttl_secs.store(3600, Ordering::SeqCst);
        Arc::new(backend)
    }

    /// Makes every call fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes refresh calls fail with 401.
    pub fn reject_refresh(&self, reject: bool) {
        self.reject_refresh.store(reject, Ordering::SeqCst);
    }

    /// Sign-ups return no session until the email is confirmed.
    pub fn require_confirmation(&self, required: bool) {
        self.require_confirmation.store(required, Ordering::SeqCst);
    }

    /// Lifetime of issued access tokens.
    pub fn set_token_ttl(&self, secs: i64) {
        self.token_ttl_secs.store(secs, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.lock().unwrap().clone()
    }

    pub fn add_university(&self, id: &str, name: &str, is_active: bool) {
        self.universities.lock().unwrap().push(University {
            id: id.to_string(),
            name: name.to_string(),
            latitude: CAMPUS.latitude,
            longitude: CAMPUS.longitude,
            is_active,
        });
    }

    pub fn add_prayer_space(&self, id: &str, name: &str, coords: Coordinates, verified: bool) {
        self.spaces.lock().unwrap().push(PrayerSpace {
            id: id.to_string(),
            name: name.to_string(),
            university_id: Some("uoft".to_string()),
            latitude: Some(coords.latitude),
            longitude: Some(coords.longitude),
            description: None,
            is_verified: verified,
        });
    }

    /// Seeds a custom-location session directly.
    pub fn seed_session(
        &self,
        id: &str,
        coords: Coordinates,
        scheduled_time: DateTime<Utc>,
        created_by: &str,
    ) -> SessionRow {
        let row = SessionRow {
            id: id.to_string(),
            prayer_type: "asr".to_string(),
            scheduled_time,
            prayer_space_id: None,
            custom_location_lat: Some(coords.latitude),
            custom_location_lng: Some(coords.longitude),
            custom_location_name: Some(format!("Spot {id}")),
            created_by: created_by.to_string(),
            notes: None,
            is_cancelled: false,
            created_at: Some(Utc::now()),
        };
        self.sessions.lock().unwrap().push(row.clone());
        row
    }

    pub fn seed_attendee(&self, session_id: &str, user_id: &str) {
        self.attendees.lock().unwrap().push(AttendeeRecordRow {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            joined_at: Utc::now(),
        });
    }

    pub fn set_display_name(&self, user_id: &str, name: &str) {
        let mut users = self.users.lock().unwrap();
        let profile = users.entry(user_id.to_string()).or_insert_with(|| {
            UserProfile::new_for(&AuthUser {
                id: user_id.to_string(),
                email: None,
                phone: None,
            })
        });
        profile.display_name = Some(name.to_string());
    }

    pub fn user(&self, user_id: &str) -> Option<UserProfile> {
        self.users.lock().unwrap().get(user_id).cloned()
    }

    pub fn sessions(&self) -> Vec<SessionRow> {
        self.sessions.lock().unwrap().clone()
    }

    pub fn attendee_ids(&self, session_id: &str) -> Vec<String> {
        self.attendees
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.session_id == session_id)
            .map(|a| a.user_id.clone())
            .collect()
    }

    /// Mutating calls in the order they reached the backend.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_online(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(BackendError::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    /// Rejects writes without a live access token.
    fn check_token(&self) -> BackendResult<()> {
        let token = self.access_token.lock().unwrap().clone();
        let expires_at = token.and_then(|t| self.token_expiries.lock().unwrap().get(&t).copied());
        match expires_at {
            Some(at) if at > Utc::now().timestamp() => Ok(()),
            Some(_) => Err(BackendError::Unauthorized("JWT expired".to_string())),
            None => Err(BackendError::Unauthorized("missing access token".to_string())),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Derives a stable user id from an email or phone.
    pub fn user_id_for(address: &str) -> String {
        let slug: String = address
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        format!("user-{slug}")
    }

    fn issue_session(&self, user: AuthUser) -> AuthSession {
        let ttl = self.token_ttl_secs.load(Ordering::SeqCst);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let access_token = format!("access-{}-{n}", user.id);
        let expires_at = Utc::now().timestamp() + ttl;
        self.token_expiries
            .lock()
            .unwrap()
            .insert(access_token.clone(), expires_at);
        AuthSession {
            access_token: SecretToken::new(access_token),
            refresh_token: SecretToken::new(format!("refresh-{}", user.id)),
            expires_at,
            user,
        }
    }

    fn session_coordinates(&self, row: &SessionRow) -> Option<(Coordinates, Option<String>)> {
        if let (Some(lat), Some(lng)) = (row.custom_location_lat, row.custom_location_lng) {
            return Some((Coordinates::new_unchecked(lat, lng), None));
        }
        let space_id = row.prayer_space_id.as_deref()?;
        let spaces = self.spaces.lock().unwrap();
        let space = spaces.iter().find(|s| s.id == space_id)?;
        Some((space.coordinates()?, Some(space.name.clone())))
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn set_access_token(&self, token: Option<SecretToken>) {
        *self.access_token.lock().unwrap() = token.map(|t| t.expose().to_string());
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        self.check_online()?;
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some(stored) if stored == password => {}
            _ => return Err(BackendError::Unauthorized("Invalid login credentials".to_string())),
        }
        drop(accounts);
        Ok(self.issue_session(AuthUser {
            id: Self::user_id_for(email),
            email: Some(email.to_string()),
            phone: None,
        }))
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpResponse> {
        self.check_online()?;
        {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(BackendError::Conflict("User already registered".to_string()));
            }
            accounts.insert(email.to_string(), password.to_string());
        }
        let user = AuthUser {
            id: Self::user_id_for(email),
            email: Some(email.to_string()),
            phone: None,
        };
        let session = if self.require_confirmation.load(Ordering::SeqCst) {
            None
        } else {
            Some(self.issue_session(user.clone()))
        };
        Ok(SignUpResponse {
            user_id: user.id,
            session,
        })
    }

    async fn send_otp(&self, target: &OtpTarget) -> BackendResult<()> {
        self.check_online()?;
        self.record(format!("otp:{target:?}"));
        Ok(())
    }

    async fn verify_otp(&self, target: &OtpTarget, code: &str) -> BackendResult<AuthSession> {
        self.check_online()?;
        if code != OTP_CODE {
            return Err(BackendError::Unauthorized("Token has expired or is invalid".to_string()));
        }
        let user = match target {
            OtpTarget::Email(email) => AuthUser {
                id: Self::user_id_for(email),
                email: Some(email.clone()),
                phone: None,
            },
            OtpTarget::Phone(phone) => AuthUser {
                id: Self::user_id_for(phone),
                email: None,
                phone: Some(phone.clone()),
            },
        };
        Ok(self.issue_session(user))
    }

    async fn refresh_session(&self, refresh_token: &SecretToken) -> BackendResult<AuthSession> {
        self.check_online()?;
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.reject_refresh.load(Ordering::SeqCst) {
            return Err(BackendError::Unauthorized("invalid_grant".to_string()));
        }
        let user_id = refresh_token
            .expose()
            .strip_prefix("refresh-")
            .ok_or_else(|| BackendError::Unauthorized("unknown refresh token".to_string()))?
            .to_string();
        Ok(self.issue_session(AuthUser {
            id: user_id,
            email: None,
            phone: None,
        }))
    }

    async fn sign_out(&self) -> BackendResult<()> {
        self.check_online()?;
        self.record("sign_out".to_string());
        Ok(())
    }

    async fn fetch_user(&self, user_id: &str) -> BackendResult<Option<UserProfile>> {
        self.check_online()?;
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn create_user(&self, profile: &UserProfile) -> BackendResult<UserProfile> {
        self.check_online()?;
        self.record(format!("create_user:{}", profile.id));
        let mut users = self.users.lock().unwrap();
        let stored = users
            .entry(profile.id.clone())
            .or_insert_with(|| UserProfile {
                created_at: Some(Utc::now()),
                ..profile.clone()
            });
        Ok(stored.clone())
    }

    async fn update_user(&self, user_id: &str, update: &ProfileUpdate) -> BackendResult<UserProfile> {
        self.check_online()?;
        self.check_token()?;
        let mut users = self.users.lock().unwrap();
        let profile = users
            .get_mut(user_id)
            .ok_or_else(|| BackendError::NotFound(format!("user {user_id}")))?;
        update.apply_to(profile);
        Ok(profile.clone())
    }

    async fn fetch_universities(&self) -> BackendResult<Vec<University>> {
        self.check_online()?;
        self.record("fetch_universities".to_string());
        let mut universities = self.universities.lock().unwrap().clone();
        universities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(universities)
    }

    async fn fetch_prayer_spaces(&self, university_id: Option<&str>) -> BackendResult<Vec<PrayerSpace>> {
        self.check_online()?;
        Ok(self
            .spaces
            .lock()
            .unwrap()
            .iter()
            .filter(|s| university_id.is_none() || s.university_id.as_deref() == university_id)
            .cloned()
            .collect())
    }

    async fn sessions_within_radius(&self, query: &RadiusQuery) -> BackendResult<Vec<NearbySessionRow>> {
        self.check_online()?;
        let center = Coordinates::new_unchecked(query.lat, query.lng);
        let sessions = self.sessions.lock().unwrap().clone();
        let attendees = self.attendees.lock().unwrap().clone();
        let users = self.users.lock().unwrap().clone();

        let mut rows: Vec<NearbySessionRow> = sessions
            .into_iter()
            .filter(|row| !row.is_cancelled && row.scheduled_time >= query.from_time)
            .filter_map(|row| {
                let (coords, space_name) = self.session_coordinates(&row)?;
                let distance = calculate_distance(&center, &coords);
                if distance > f64::from(query.radius_meters) {
                    return None;
                }
                let count = attendees.iter().filter(|a| a.session_id == row.id).count();
                Some(NearbySessionRow {
                    creator_name: users.get(&row.created_by).and_then(|u| u.display_name.clone()),
                    prayer_space_name: space_name,
                    distance_meters: distance,
                    attendee_count: u32::try_from(count).unwrap(),
                    session: row,
                })
            })
            .collect();

        rows.sort_by_key(|r| r.session.scheduled_time);
        rows.truncate(query.limit as usize);
        Ok(rows)
    }

    async fn joined_session_ids(&self, user_id: &str, session_ids: &[String]) -> BackendResult<Vec<String>> {
        self.check_online()?;
        Ok(self
            .attendees
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id && session_ids.contains(&a.session_id))
            .map(|a| a.session_id.clone())
            .collect())
    }

    async fn insert_session(&self, session: &NewSessionRow) -> BackendResult<SessionRow> {
        self.check_online()?;
        self.check_token()?;
        let row = SessionRow {
            id: self.next_id("session"),
            prayer_type: session.prayer_type.clone(),
            scheduled_time: session.scheduled_time,
            prayer_space_id: session.prayer_space_id.clone(),
            custom_location_lat: session.custom_location_lat,
            custom_location_lng: session.custom_location_lng,
            custom_location_name: session.custom_location_name.clone(),
            created_by: session.created_by.clone(),
            notes: session.notes.clone(),
            is_cancelled: false,
            created_at: Some(Utc::now()),
        };
        self.record(format!("insert_session:{}", row.id));
        self.sessions.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn cancel_session(&self, session_id: &str) -> BackendResult<()> {
        self.check_online()?;
        self.check_token()?;
        self.record(format!("cancel_session:{session_id}"));
        let mut sessions = self.sessions.lock().unwrap();
        let row = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| BackendError::NotFound(format!("session {session_id}")))?;
        row.is_cancelled = true;
        Ok(())
    }

    async fn insert_attendee(&self, session_id: &str, user_id: &str) -> BackendResult<AttendeeRecordRow> {
        self.check_online()?;
        self.check_token()?;
        self.record(format!("join:{session_id}"));
        let mut attendees = self.attendees.lock().unwrap();
        if attendees
            .iter()
            .any(|a| a.session_id == session_id && a.user_id == user_id)
        {
            return Err(BackendError::Conflict(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }
        let record = AttendeeRecordRow {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            joined_at: Utc::now(),
        };
        attendees.push(record.clone());
        Ok(record)
    }

    async fn delete_attendee(&self, session_id: &str, user_id: &str) -> BackendResult<()> {
        self.check_online()?;
        self.check_token()?;
        self.record(format!("leave:{session_id}"));
        self.attendees
            .lock()
            .unwrap()
            .retain(|a| !(a.session_id == session_id && a.user_id == user_id));
        Ok(())
    }

    async fn fetch_attendees(&self, session_id: &str) -> BackendResult<Vec<AttendeeRow>> {
        self.check_online()?;
        let users = self.users.lock().unwrap().clone();
        let mut rows: Vec<AttendeeRow> = self
            .attendees
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.session_id == session_id)
            .map(|a| AttendeeRow {
                session_id: a.session_id.clone(),
                user_id: a.user_id.clone(),
                joined_at: a.joined_at,
                user: AttendeeUserRow {
                    display_name: users.get(&a.user_id).and_then(|u| u.display_name.clone()),
                },
            })
            .collect();
        rows.sort_by_key(|r| r.joined_at);
        Ok(rows)
    }
}

/// Prayer API that serves a fixed timetable and counts calls.
#[derive(Default)]
pub struct FakePrayerApi {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakePrayerApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn timetable(date: NaiveDate) -> PrayerTimes {
    PrayerTimes::from_clock_strings(date, ["05:40", "12:15", "15:30", "18:05", "19:25"]).unwrap()
}

#[async_trait]
impl PrayerTimesApi for FakePrayerApi {
    async fn fetch_timings(&self, _coords: Coordinates, date: NaiveDate) -> PrayerResult<PrayerTimes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(PrayerError::Network("timed out".to_string()));
        }
        Ok(timetable(date))
    }
}

/// Location provider with a fixed answer.
pub struct FixedLocation {
    pub permission: PermissionStatus,
    pub position: Coordinates,
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn current_position(&self) -> PlatformResult<Coordinates> {
        Ok(self.position)
    }
}

/// Notification provider that records what it was asked to do.
pub struct RecordingNotifications {
    pub permission: PermissionStatus,
    pub token: Option<String>,
    pub scheduled: Mutex<Vec<LocalNotification>>,
    pub cancellations: AtomicUsize,
}

impl RecordingNotifications {
    pub fn granted(token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            permission: PermissionStatus::Granted,
            token: token.map(str::to_string),
            scheduled: Mutex::new(Vec::new()),
            cancellations: AtomicUsize::new(0),
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            permission: PermissionStatus::Denied,
            token: None,
            scheduled: Mutex::new(Vec::new()),
            cancellations: AtomicUsize::new(0),
        })
    }

    pub fn scheduled_ids(&self) -> Vec<String> {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.id.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationProvider for RecordingNotifications {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn push_token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn schedule_local(&self, notification: LocalNotification) -> PlatformResult<()> {
        self.scheduled.lock().unwrap().push(notification);
        Ok(())
    }

    async fn cancel_all(&self) -> PlatformResult<()> {
        self.cancellations.fetch_add(1, Ordering::SeqCst);
        self.scheduled.lock().unwrap().clear();
        Ok(())
    }
}

/// A core over the fakes with an in-memory database.
pub fn core(backend: &Arc<FakeBackend>, prayer_api: &Arc<FakePrayerApi>) -> JamaatCore {
    JamaatCore::in_memory(
        config(),
        Arc::clone(backend) as Arc<dyn Backend>,
        Arc::clone(prayer_api) as Arc<dyn PrayerTimesApi>,
    )
    .unwrap()
}

/// A core signed in as `email`, with an onboarded profile.
pub async fn signed_in_core(
    backend: &Arc<FakeBackend>,
    prayer_api: &Arc<FakePrayerApi>,
    email: &str,
) -> JamaatCore {
    let core = core(backend, prayer_api);
    core.sign_up(email, PASSWORD).await.unwrap();
    core.complete_onboarding("Test User", None).await.unwrap();
    core
}

/// A valid custom-location form `minutes` from now, `meters` north of
/// campus.
pub fn custom_session_input(minutes: i64, meters: f64) -> CreateSessionInput {
    let coords = north_of_campus(meters);
    CreateSessionInput {
        prayer_type: jamaat_core::prayer::PrayerName::Asr,
        scheduled_time: Utc::now() + Duration::minutes(minutes),
        location_type: LocationType::Custom,
        prayer_space_id: None,
        custom_latitude: Some(coords.latitude),
        custom_longitude: Some(coords.longitude),
        custom_location_name: Some("Library 3rd floor".to_string()),
        notes: None,
    }
}
