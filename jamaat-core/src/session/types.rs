//! Prayer session domain types and their conversion from wire rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SessionError;
use crate::backend::{AttendeeRow, NearbySessionRow, SessionRow};
use crate::location::Coordinates;
use crate::prayer::PrayerName;

/// Where a session takes place. Exactly one kind of location is possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionLocation {
    /// A registered prayer space.
    PrayerSpace {
        /// Id of the `prayer_spaces` row.
        prayer_space_id: String,
    },
    /// An ad-hoc spot picked on the map.
    Custom {
        latitude: f64,
        longitude: f64,
        /// Short description, e.g. "Library 3rd floor".
        label: String,
    },
}

impl SessionLocation {
    /// Coordinates of a custom location.
    #[must_use]
    pub const fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Custom {
                latitude,
                longitude,
                ..
            } => Some(Coordinates::new_unchecked(*latitude, *longitude)),
            Self::PrayerSpace { .. } => None,
        }
    }
}

/// A scheduled congregational prayer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerSession {
    pub id: String,
    pub prayer_type: PrayerName,
    pub scheduled_time: DateTime<Utc>,
    pub location: SessionLocation,
    pub created_by: String,
    pub notes: Option<String>,
    pub is_cancelled: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for PrayerSession {
    type Error = SessionError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let prayer_type = PrayerName::parse(&row.prayer_type).ok_or_else(|| {
            SessionError::InvalidRow(format!("unknown prayer type {:?}", row.prayer_type))
        })?;

        let location = match (
            row.prayer_space_id,
            row.custom_location_lat,
            row.custom_location_lng,
            row.custom_location_name,
        ) {
            (Some(prayer_space_id), None, None, None) => {
                SessionLocation::PrayerSpace { prayer_space_id }
            }
            (None, Some(lat), Some(lng), Some(label)) => {
                let coords = Coordinates::new(lat, lng)
                    .map_err(|e| SessionError::InvalidRow(e.to_string()))?;
                SessionLocation::Custom {
                    latitude: coords.latitude,
                    longitude: coords.longitude,
                    label,
                }
            }
            _ => {
                return Err(SessionError::InvalidRow(format!(
                    "session {} must have exactly one location",
                    row.id
                )))
            }
        };

        Ok(Self {
            id: row.id,
            prayer_type,
            scheduled_time: row.scheduled_time,
            location,
            created_by: row.created_by,
            notes: row.notes,
            is_cancelled: row.is_cancelled,
            created_at: row.created_at,
        })
    }
}

/// A session as shown in the nearby feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub session: PrayerSession,
    pub prayer_space_name: Option<String>,
    pub creator_name: Option<String>,
    pub distance_meters: f64,
    pub attendee_count: u32,
    /// Whether the signed-in user attends.
    pub is_joined: bool,
}

impl FeedEntry {
    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.session.id
    }

    /// Where to show the session: the space name, the custom label, or a
    /// generic fallback.
    #[must_use]
    pub fn location_label(&self) -> &str {
        match &self.session.location {
            SessionLocation::Custom { label, .. } => label,
            SessionLocation::PrayerSpace { .. } => {
                self.prayer_space_name.as_deref().unwrap_or("Prayer space")
            }
        }
    }
}

impl TryFrom<NearbySessionRow> for FeedEntry {
    type Error = SessionError;

    fn try_from(row: NearbySessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            session: row.session.try_into()?,
            prayer_space_name: row.prayer_space_name,
            creator_name: row.creator_name,
            distance_meters: row.distance_meters,
            attendee_count: row.attendee_count,
            is_joined: false,
        })
    }
}

/// An attendee with their display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl From<AttendeeRow> for AttendeeProfile {
    fn from(row: AttendeeRow) -> Self {
        Self {
            user_id: row.user_id,
            display_name: row.user.display_name,
            joined_at: row.joined_at,
        }
    }
}

/// How the creator picked the location on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    /// A registered campus prayer space.
    Campus,
    /// A point on the map with a label.
    Custom,
}

/// The create-session form as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionInput {
    pub prayer_type: PrayerName,
    pub scheduled_time: DateTime<Utc>,
    pub location_type: LocationType,
    #[serde(default)]
    pub prayer_space_id: Option<String>,
    #[serde(default)]
    pub custom_latitude: Option<f64>,
    #[serde(default)]
    pub custom_longitude: Option<f64>,
    #[serde(default)]
    pub custom_location_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A realtime change event from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionChange {
    /// A `prayer_sessions` row was inserted.
    SessionInserted { row: SessionRow },
    /// A `prayer_sessions` row changed (including cancellation).
    SessionUpdated { row: SessionRow },
    /// A `prayer_sessions` row was deleted.
    SessionDeleted { id: String },
    /// A `session_attendees` row was inserted.
    AttendeeJoined { session_id: String, user_id: String },
    /// A `session_attendees` row was deleted.
    AttendeeLeft { session_id: String, user_id: String },
}

/// What a realtime event did to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPatch {
    /// The feed changed in place.
    Applied,
    /// The event does not affect the feed.
    Ignored,
    /// The event matters but cannot be applied locally (e.g. distance to a
    /// prayer space is unknown); the feed should be refetched.
    RefreshRequired,
}
