//! Wire rows exchanged with the backend.
//!
//! These mirror the table and RPC shapes exactly. Domain types are built
//! from them through `TryFrom` conversions that enforce invariants, so a
//! malformed row is rejected at the boundary instead of leaking into state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A `prayer_sessions` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub prayer_type: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub prayer_space_id: Option<String>,
    #[serde(default)]
    pub custom_location_lat: Option<f64>,
    #[serde(default)]
    pub custom_location_lng: Option<f64>,
    #[serde(default)]
    pub custom_location_name: Option<String>,
    pub created_by: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `prayer_sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSessionRow {
    pub prayer_type: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prayer_space_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_location_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_location_lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_location_name: Option<String>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Arguments of the `get_sessions_within_radius` RPC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadiusQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_meters: u32,
    pub from_time: DateTime<Utc>,
    pub limit: u32,
}

/// A row returned by the `get_sessions_within_radius` RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbySessionRow {
    #[serde(flatten)]
    pub session: SessionRow,
    #[serde(default)]
    pub prayer_space_name: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
    pub distance_meters: f64,
    #[serde(default)]
    pub attendee_count: u32,
}

/// A `session_attendees` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeRecordRow {
    pub session_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

/// An attendee row with the embedded user.
///
/// The user must arrive as an object; arrays or missing embeds fail to
/// decode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttendeeRow {
    pub session_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
    #[serde(deserialize_with = "object_only")]
    pub user: AttendeeUserRow,
}

/// Accepts only a JSON object, rejecting the array form an ambiguous
/// embed can produce.
fn object_only<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected embedded object"));
    }
    serde_json::from_value(value).map_err(serde::de::Error::custom)
}

/// The embedded user of an [`AttendeeRow`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttendeeUserRow {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_row_flattens_session_fields() {
        let json = r#"{
            "id": "s1",
            "prayer_type": "asr",
            "scheduled_time": "2025-03-07T20:30:00Z",
            "prayer_space_id": "p1",
            "created_by": "u1",
            "is_cancelled": false,
            "prayer_space_name": "MSA Room",
            "creator_name": "Yusuf",
            "distance_meters": 412.5,
            "attendee_count": 4
        }"#;

        let row: NearbySessionRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.session.id, "s1");
        assert_eq!(row.session.prayer_space_id.as_deref(), Some("p1"));
        assert_eq!(row.attendee_count, 4);
        assert!((row.distance_meters - 412.5).abs() < f64::EPSILON);
    }

    #[test]
    fn attendee_row_requires_user_object() {
        let object = r#"{
            "session_id": "s1",
            "user_id": "u1",
            "joined_at": "2025-03-07T20:00:00Z",
            "user": {"display_name": "Aisha"}
        }"#;
        let array = r#"{
            "session_id": "s1",
            "user_id": "u1",
            "joined_at": "2025-03-07T20:00:00Z",
            "user": [{"display_name": "Aisha"}]
        }"#;
        let empty_array = r#"{
            "session_id": "s1",
            "user_id": "u1",
            "joined_at": "2025-03-07T20:00:00Z",
            "user": []
        }"#;

        let row: AttendeeRow = serde_json::from_str(object).unwrap();
        assert_eq!(row.user.display_name.as_deref(), Some("Aisha"));
        assert!(serde_json::from_str::<AttendeeRow>(array).is_err());
        assert!(serde_json::from_str::<AttendeeRow>(empty_array).is_err());
    }

    #[test]
    fn new_session_row_omits_empty_location_group() {
        let row = NewSessionRow {
            prayer_type: "isha".to_string(),
            scheduled_time: "2025-03-07T00:25:00Z".parse().unwrap(),
            prayer_space_id: Some("p1".to_string()),
            custom_location_lat: None,
            custom_location_lng: None,
            custom_location_name: None,
            created_by: "u1".to_string(),
            notes: None,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("custom_location_lat").is_none());
        assert_eq!(json["prayer_space_id"], "p1");
    }
}
