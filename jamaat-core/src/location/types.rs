//! Location data types.

use serde::{Deserialize, Serialize};

use super::error::{LocationError, Result};

/// A point on the earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, -90.0 to 90.0
    pub latitude: f64,
    /// Longitude, -180.0 to 180.0
    pub longitude: f64,
}

impl Coordinates {
    /// Creates coordinates after checking they are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::InvalidCoordinates`] for NaN, infinite, or
    /// out-of-range values.
    ///
    /// # Examples
    ///
    /// ```
    /// use jamaat_core::location::Coordinates;
    ///
    /// assert!(Coordinates::new(43.6532, -79.3832).is_ok());
    /// assert!(Coordinates::new(91.0, 0.0).is_err());
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid_lat = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let valid_lon = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);

        if valid_lat && valid_lon {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(LocationError::InvalidCoordinates {
                latitude,
                longitude,
            })
        }
    }

    /// Builds coordinates without validation. Intended for values that came
    /// from a trusted source such as the backend or the device GPS.
    #[must_use]
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        super::geo::calculate_distance(self, other)
    }
}

/// Radius choices offered by the feed's radius selector, in meters.
pub const RADIUS_OPTIONS_M: [u32; 5] = [500, 1_000, 2_000, 5_000, 10_000];

/// Default search radius for the nearby feed.
pub const DEFAULT_RADIUS_M: u32 = 5_000;

/// Smallest radius a caller may configure.
pub const MIN_RADIUS_M: u32 = 100;

/// Largest radius a caller may configure.
pub const MAX_RADIUS_M: u32 = 50_000;
