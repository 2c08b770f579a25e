//! Distance math, coordinate rounding, and approximate-location keys.
//!
//! This module provides functions for:
//! - Haversine distance between two coordinates
//! - Human-readable distance labels
//! - Coordinate rounding before values leave the device
//! - Geohash keys that label a ~5 km area without exposing exact position

use super::types::Coordinates;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geohash length used for approximate-location keys (~±2.4 km cell).
pub const APPROXIMATE_KEY_PRECISION: usize = 5;

/// Calculates the great-circle distance between two points using the
/// Haversine formula.
///
/// # Examples
///
/// ```
/// use jamaat_core::location::{calculate_distance, Coordinates};
///
/// let toronto = Coordinates::new_unchecked(43.6532, -79.3832);
/// let mississauga = Coordinates::new_unchecked(43.5890, -79.6441);
/// let d = calculate_distance(&toronto, &mississauga);
/// assert!((d - 22_000.0).abs() < 1_000.0);
/// ```
#[must_use]
pub fn calculate_distance(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Returns whether `point` lies within `radius_m` meters of `center`.
#[must_use]
pub fn is_within_radius(center: &Coordinates, point: &Coordinates, radius_m: f64) -> bool {
    calculate_distance(center, point) <= radius_m
}

/// Formats a distance for display.
///
/// Distances under a kilometer are shown in whole meters, longer ones in
/// kilometers with one decimal.
///
/// # Examples
///
/// ```
/// use jamaat_core::location::format_distance;
///
/// assert_eq!(format_distance(350.4), "350 m");
/// assert_eq!(format_distance(1_234.0), "1.2 km");
/// ```
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters < 0.0 {
        return "-".to_string();
    }
    if meters < 1_000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.1} km", meters / 1_000.0)
    }
}

/// Rounds a coordinate to `places` decimal places.
///
/// Non-finite input yields 0.0.
///
/// ```
/// use jamaat_core::location::round_coordinate;
///
/// assert_eq!(round_coordinate(43.653_226, 4), 43.6532);
/// ```
#[must_use]
pub fn round_coordinate(coord: f64, places: i32) -> f64 {
    if !coord.is_finite() {
        return 0.0;
    }

    let multiplier = 10_f64.powi(places);
    (coord * multiplier).round() / multiplier
}

/// Geohash label for the ~5 km area around `coords`.
///
/// Returns an empty string if encoding fails, which only happens for
/// out-of-range input.
#[must_use]
pub fn approximate_key(coords: &Coordinates) -> String {
    geohash::encode(
        geohash::Coord {
            x: coords.longitude,
            y: coords.latitude,
        },
        APPROXIMATE_KEY_PRECISION,
    )
    .unwrap_or_default()
}
