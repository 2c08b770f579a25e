//! University and prayer space reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location::Coordinates;

/// A campus users can affiliate with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl University {
    /// Campus location.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new_unchecked(self.latitude, self.longitude)
    }
}

/// A named room or hall where sessions can be held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerSpace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub university_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

impl PrayerSpace {
    /// Location, when the space has one on record.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng).ok(),
            _ => None,
        }
    }
}

/// The university list as persisted locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUniversities {
    pub universities: Vec<University>,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prayer_space_without_location() {
        let space: PrayerSpace =
            serde_json::from_str(r#"{"id": "p1", "name": "Room 204", "is_verified": true}"#)
                .unwrap();
        assert!(space.coordinates().is_none());
        assert!(space.is_verified);
    }

    #[test]
    fn university_defaults_active() {
        let university: University = serde_json::from_str(
            r#"{"id": "u1", "name": "UofT", "latitude": 43.66, "longitude": -79.39}"#,
        )
        .unwrap();
        assert!(university.is_active);
    }
}
