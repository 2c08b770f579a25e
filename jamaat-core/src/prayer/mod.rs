//! Prayer times: retrieval, caching, and derivation.
//!
//! # Architecture
//!
//! ```text
//! PrayerTimesCache (day-keyed, location-aware)
//!     ├── LocalStore (persisted entries)
//!     └── PrayerTimesApi (AladhanClient over HTTP)
//!
//! schedule (pure)
//!     current / next prayer, session time suggestions
//! ```
//!
//! Timetables are immutable for a given day and approximate location, so
//! they are fetched at most once per day per ~5 km and kept for a week.

mod cache;
mod client;
mod error;
pub mod schedule;
pub mod types;

pub use cache::{
    cache_key, CachedPrayerTimes, PrayerTimesCache, CACHE_PROXIMITY_M, CACHE_RETENTION_DAYS,
    CACHE_TTL_HOURS,
};
pub use client::{parse_timings_response, AladhanClient, PrayerTimesApi};
pub use error::{PrayerError, PrayerResult};
pub use schedule::{
    current_prayer_at, get_current_prayer, get_next_prayer, next_prayer_at, suggest_prayer_time,
    suggest_prayer_time_at,
};
pub use types::{CurrentPrayer, NextPrayer, PrayerName, PrayerTimes};
