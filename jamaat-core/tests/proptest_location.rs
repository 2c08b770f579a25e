//! Property-based tests for coordinates and distance math.
//!
//! These tests verify:
//! - Coordinate validation accepts exactly the valid range
//! - Haversine distance is a non-negative, symmetric, bounded metric
//! - Radius checks and coordinate rounding agree with the distance math

#![allow(clippy::float_cmp)]

use jamaat_core::location::{
    approximate_key, calculate_distance, format_distance, is_within_radius, round_coordinate,
    Coordinates,
};
use proptest::prelude::*;

/// Half the earth's circumference, with slack for the mean radius used.
const MAX_DISTANCE_M: f64 = 20_100_000.0;

fn coordinates() -> impl Strategy<Value = Coordinates> {
    (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lon)| Coordinates::new_unchecked(lat, lon))
}

/// Verifies that the poles and the antimeridian are valid coordinates.
#[test]
fn boundary_coordinates_are_valid() {
    for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0), (0.0, 0.0)] {
        assert!(Coordinates::new(lat, lon).is_ok(), "({lat}, {lon}) must be valid");
    }
}

/// Verifies that non-finite values are rejected.
#[test]
fn non_finite_coordinates_are_rejected() {
    for (lat, lon) in [
        (f64::NAN, 0.0),
        (0.0, f64::NAN),
        (f64::INFINITY, 0.0),
        (0.0, f64::NEG_INFINITY),
    ] {
        assert!(Coordinates::new(lat, lon).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: every in-range pair is accepted unchanged.
    #[test]
    fn valid_range_is_accepted(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
        let coords = Coordinates::new(lat, lon).expect("in-range coordinates must be valid");
        prop_assert_eq!(coords.latitude, lat);
        prop_assert_eq!(coords.longitude, lon);
    }

    /// Property: a latitude beyond the poles is rejected.
    #[test]
    fn out_of_range_latitude_is_rejected(
        lat in prop_oneof![90.000_001f64..1_000.0, -1_000.0f64..-90.000_001],
        lon in -180.0f64..=180.0,
    ) {
        prop_assert!(Coordinates::new(lat, lon).is_err());
    }

    /// Property: a longitude beyond the antimeridian is rejected.
    #[test]
    fn out_of_range_longitude_is_rejected(
        lat in -90.0f64..=90.0,
        lon in prop_oneof![180.000_001f64..1_000.0, -1_000.0f64..-180.000_001],
    ) {
        prop_assert!(Coordinates::new(lat, lon).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: distance is finite, non-negative and never more than half
    /// the circumference.
    #[test]
    fn distance_is_bounded(a in coordinates(), b in coordinates()) {
        let d = calculate_distance(&a, &b);
        prop_assert!(d.is_finite());
        prop_assert!(d >= 0.0);
        prop_assert!(d <= MAX_DISTANCE_M, "distance {} exceeds half circumference", d);
    }

    /// Property: distance does not depend on argument order.
    #[test]
    fn distance_is_symmetric(a in coordinates(), b in coordinates()) {
        let ab = calculate_distance(&a, &b);
        let ba = calculate_distance(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-6, "{} != {}", ab, ba);
    }

    /// Property: a point is at distance zero from itself and always within
    /// any radius of itself.
    #[test]
    fn self_distance_is_zero(a in coordinates(), radius in 0.0f64..50_000.0) {
        prop_assert!(calculate_distance(&a, &a) < 1e-6);
        prop_assert!(is_within_radius(&a, &a, radius));
    }

    /// Property: the radius check agrees with the distance.
    #[test]
    fn radius_check_matches_distance(
        a in coordinates(),
        b in coordinates(),
        radius in 0.0f64..MAX_DISTANCE_M,
    ) {
        let d = calculate_distance(&a, &b);
        prop_assert_eq!(is_within_radius(&a, &b, radius), d <= radius);
    }

    /// Property: rounding moves a coordinate by at most half a unit in the
    /// last kept place.
    #[test]
    fn rounding_stays_close(coord in -180.0f64..=180.0, places in 0i32..8) {
        let rounded = round_coordinate(coord, places);
        let half_unit = 0.5 / 10f64.powi(places);
        prop_assert!((rounded - coord).abs() <= half_unit + 1e-9);
    }

    /// Property: every valid position has a non-empty area key.
    #[test]
    fn area_key_is_never_empty(a in coordinates()) {
        prop_assert!(!approximate_key(&a).is_empty());
    }

    /// Property: display distances carry a unit.
    #[test]
    fn formatted_distance_has_unit(meters in 0.0f64..100_000.0) {
        let label = format_distance(meters);
        prop_assert!(label.ends_with(" m") || label.ends_with(" km"), "{}", label);
    }
}
