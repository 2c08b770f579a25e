//! Create-session form validation.

use chrono::{DateTime, Utc};

use super::types::{CreateSessionInput, LocationType, SessionLocation};
use crate::backend::NewSessionRow;
use crate::location::Coordinates;
use crate::prayer::PrayerName;
use crate::validation::{Collector, ValidationError};

/// Maximum length of a custom location label, in characters.
pub const MAX_LABEL_LEN: usize = 100;

/// Maximum length of session notes, in characters.
pub const MAX_NOTES_LEN: usize = 500;

/// A create-session form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSession {
    pub prayer_type: PrayerName,
    pub scheduled_time: DateTime<Utc>,
    pub location: SessionLocation,
    pub notes: Option<String>,
}

impl ValidSession {
    /// The insert row for `created_by`.
    #[must_use]
    pub fn into_row(self, created_by: &str) -> NewSessionRow {
        let (prayer_space_id, lat, lng, name) = match self.location {
            SessionLocation::PrayerSpace { prayer_space_id } => {
                (Some(prayer_space_id), None, None, None)
            }
            SessionLocation::Custom {
                latitude,
                longitude,
                label,
            } => (None, Some(latitude), Some(longitude), Some(label)),
        };

        NewSessionRow {
            prayer_type: self.prayer_type.as_str().to_string(),
            scheduled_time: self.scheduled_time,
            prayer_space_id,
            custom_location_lat: lat,
            custom_location_lng: lng,
            custom_location_name: name,
            created_by: created_by.to_string(),
            notes: self.notes,
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validates the create-session form at `now`.
///
/// Rejects a scheduled time in the past, a campus session without a prayer
/// space, a custom session without valid coordinates or a label, and
/// over-long label or notes. Fields of the unused location kind are
/// ignored.
///
/// # Errors
///
/// Returns every invalid field, keyed by form field name.
pub fn validate_create_session(
    input: &CreateSessionInput,
    now: DateTime<Utc>,
) -> Result<ValidSession, ValidationError> {
    let mut errors = Collector::default();

    if input.scheduled_time < now {
        errors.push("scheduledTime", "Session time must be in the future");
    }

    let location = match input.location_type {
        LocationType::Campus => {
            if let Some(prayer_space_id) = non_blank(input.prayer_space_id.as_ref()) {
                Some(SessionLocation::PrayerSpace { prayer_space_id })
            } else {
                errors.push("prayerSpaceId", "Please select a prayer space");
                None
            }
        }
        LocationType::Custom => {
            let coords = match (input.custom_latitude, input.custom_longitude) {
                (Some(lat), Some(lng)) => Coordinates::new(lat, lng).ok(),
                _ => None,
            };
            if coords.is_none() {
                errors.push("customLocation", "Please pick a location on the map");
            }

            let label = non_blank(input.custom_location_name.as_ref());
            match &label {
                None => errors.push("customLocationName", "Please name the location"),
                Some(l) if l.chars().count() > MAX_LABEL_LEN => errors.push(
                    "customLocationName",
                    format!("Location name must be at most {MAX_LABEL_LEN} characters"),
                ),
                Some(_) => {}
            }

            match (coords, label) {
                (Some(c), Some(label)) if label.chars().count() <= MAX_LABEL_LEN => {
                    Some(SessionLocation::Custom {
                        latitude: c.latitude,
                        longitude: c.longitude,
                        label,
                    })
                }
                _ => None,
            }
        }
    };

    let notes = non_blank(input.notes.as_ref());
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LEN)
    {
        errors.push(
            "notes",
            format!("Notes must be at most {MAX_NOTES_LEN} characters"),
        );
    }

    errors.finish()?;

    // finish() only succeeds when every branch above produced a location.
    let location =
        location.ok_or_else(|| ValidationError::single("location", "Location is required"))?;

    Ok(ValidSession {
        prayer_type: input.prayer_type,
        scheduled_time: input.scheduled_time,
        location,
        notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2025-03-07T18:00:00Z".parse().unwrap()
    }

    fn campus() -> CreateSessionInput {
        CreateSessionInput {
            prayer_type: PrayerName::Maghrib,
            scheduled_time: now() + Duration::minutes(30),
            location_type: LocationType::Campus,
            prayer_space_id: Some("p1".to_string()),
            custom_latitude: None,
            custom_longitude: None,
            custom_location_name: None,
            notes: Some("  Bring a mat  ".to_string()),
        }
    }

    fn custom() -> CreateSessionInput {
        CreateSessionInput {
            location_type: LocationType::Custom,
            prayer_space_id: None,
            custom_latitude: Some(43.66),
            custom_longitude: Some(-79.39),
            custom_location_name: Some("Robarts lobby".to_string()),
            notes: None,
            ..campus()
        }
    }

    #[test]
    fn valid_campus_session() {
        let valid = validate_create_session(&campus(), now()).unwrap();
        assert_eq!(
            valid.location,
            SessionLocation::PrayerSpace {
                prayer_space_id: "p1".to_string()
            }
        );
        assert_eq!(valid.notes.as_deref(), Some("Bring a mat"));
    }

    #[test]
    fn past_time_is_rejected() {
        let input = CreateSessionInput {
            scheduled_time: now() - Duration::minutes(1),
            ..campus()
        };
        let err = validate_create_session(&input, now()).unwrap_err();
        assert!(err.has_field("scheduledTime"));
    }

    #[test]
    fn campus_without_space_is_rejected() {
        let input = CreateSessionInput {
            prayer_space_id: Some("   ".to_string()),
            ..campus()
        };
        let err = validate_create_session(&input, now()).unwrap_err();
        assert_eq!(
            err.message_for("prayerSpaceId"),
            Some("Please select a prayer space")
        );
    }

    #[test]
    fn custom_requires_coordinates_and_label() {
        let input = CreateSessionInput {
            custom_latitude: None,
            custom_location_name: None,
            ..custom()
        };
        let err = validate_create_session(&input, now()).unwrap_err();
        assert!(err.has_field("customLocation"));
        assert!(err.has_field("customLocationName"));
    }

    #[test]
    fn custom_rejects_out_of_range_coordinates() {
        let input = CreateSessionInput {
            custom_latitude: Some(123.0),
            ..custom()
        };
        assert!(validate_create_session(&input, now())
            .unwrap_err()
            .has_field("customLocation"));
    }

    #[test]
    fn long_label_and_notes_are_rejected() {
        let input = CreateSessionInput {
            custom_location_name: Some("x".repeat(101)),
            notes: Some("y".repeat(501)),
            ..custom()
        };
        let err = validate_create_session(&input, now()).unwrap_err();
        assert!(err.has_field("customLocationName"));
        assert!(err.has_field("notes"));
    }

    #[test]
    fn custom_ignores_stale_space_id() {
        let input = CreateSessionInput {
            prayer_space_id: Some("p1".to_string()),
            ..custom()
        };
        let row = validate_create_session(&input, now())
            .unwrap()
            .into_row("u1");
        assert_eq!(row.prayer_space_id, None);
        assert_eq!(row.custom_location_name.as_deref(), Some("Robarts lobby"));
        assert_eq!(row.prayer_type, "maghrib");
    }
}
