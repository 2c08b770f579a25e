//! Location module for Jamaat.
//!
//! Provides the geometry the feed and the prayer-time cache rely on:
//! - Haversine distance and radius checks
//! - Distance labels for session cards
//! - Coordinate rounding before coordinates leave the device
//! - Geohash keys for approximate-location labelling
//!
//! # Example Usage
//!
//! ```
//! use jamaat_core::location::{calculate_distance, format_distance, Coordinates};
//!
//! let here = Coordinates::new(43.6532, -79.3832).unwrap();
//! let masjid = Coordinates::new(43.6561, -79.3802).unwrap();
//! println!("{}", format_distance(calculate_distance(&here, &masjid)));
//! ```

mod error;
pub mod geo;
pub mod types;

pub use error::{LocationError, Result};
pub use geo::{
    approximate_key, calculate_distance, format_distance, is_within_radius, round_coordinate,
};
pub use types::{Coordinates, DEFAULT_RADIUS_M, MAX_RADIUS_M, MIN_RADIUS_M, RADIUS_OPTIONS_M};
