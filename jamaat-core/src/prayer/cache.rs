//! Local cache in front of the prayer time API.
//!
//! Entries are keyed by calendar day. An entry is reused only while it is
//! younger than [`CACHE_TTL_HOURS`] and was computed within
//! [`CACHE_PROXIMITY_M`] of the requested position; anything older than
//! [`CACHE_RETENTION_DAYS`] is evicted after a successful fetch.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::client::PrayerTimesApi;
use super::error::PrayerResult;
use super::types::PrayerTimes;
use crate::location::{approximate_key, calculate_distance, Coordinates};
use crate::storage::{LocalStore, PRAYER_TIMES_PREFIX};

/// How long a cached timetable is trusted.
pub const CACHE_TTL_HOURS: i64 = 24;

/// Maximum distance between the cached and requested position.
pub const CACHE_PROXIMITY_M: f64 = 5_000.0;

/// Days of history kept in the cache.
pub const CACHE_RETENTION_DAYS: i64 = 7;

/// A stored timetable together with where and when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPrayerTimes {
    /// The timetable.
    pub times: PrayerTimes,
    /// Position the timetable was computed for.
    pub location: Coordinates,
    /// Local time the entry was written.
    pub fetched_at: NaiveDateTime,
}

impl CachedPrayerTimes {
    /// Whether this entry can answer a request at `coords` made at `now`.
    #[must_use]
    pub fn is_valid_for(&self, coords: &Coordinates, now: NaiveDateTime) -> bool {
        let age = now - self.fetched_at;
        age >= Duration::zero()
            && age < Duration::hours(CACHE_TTL_HOURS)
            && calculate_distance(&self.location, coords) <= CACHE_PROXIMITY_M
    }
}

/// Cache key for the given day.
#[must_use]
pub fn cache_key(date: NaiveDate) -> String {
    format!("{PRAYER_TIMES_PREFIX}{}", date.format("%Y-%m-%d"))
}

/// Prayer time lookup with a persisted, location-aware cache.
pub struct PrayerTimesCache {
    store: Arc<LocalStore>,
    api: Arc<dyn PrayerTimesApi>,
}

impl PrayerTimesCache {
    /// Creates a cache backed by `store` that falls through to `api`.
    #[must_use]
    pub fn new(store: Arc<LocalStore>, api: Arc<dyn PrayerTimesApi>) -> Self {
        Self { store, api }
    }

    /// Today's prayer times at `coords`, using the device's local time.
    ///
    /// # Errors
    ///
    /// See [`fetch_at`](Self::fetch_at).
    pub async fn fetch_prayer_times(&self, coords: Coordinates) -> PrayerResult<PrayerTimes> {
        self.fetch_at(coords, Local::now().naive_local()).await
    }

    /// Prayer times for the day of `now` at `coords`.
    ///
    /// Serves a valid cached entry when one exists, otherwise fetches and
    /// stores a fresh one. If the fetch fails, yesterday's cached entry is
    /// served instead when present.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when there is no fallback entry. A fresh
    /// timetable is returned even if it cannot be cached.
    pub async fn fetch_at(
        &self,
        coords: Coordinates,
        now: NaiveDateTime,
    ) -> PrayerResult<PrayerTimes> {
        let today = now.date();
        let key = cache_key(today);

        if let Some(entry) = self.read_entry(&key) {
            if entry.is_valid_for(&coords, now) {
                debug!(%key, "Prayer times cache hit");
                return Ok(entry.times);
            }
        }

        match self.api.fetch_timings(coords, today).await {
            Ok(times) => {
                let entry = CachedPrayerTimes {
                    times: times.clone(),
                    location: coords,
                    fetched_at: now,
                };
                if let Err(e) = self.store.set_json(&key, &entry) {
                    warn!(error = %e, %key, "Failed to cache prayer times");
                    return Ok(times);
                }
                info!(
                    %key,
                    area = %approximate_key(&coords),
                    "Cached fresh prayer times"
                );
                if let Err(e) = self.evict_older_than(today - Duration::days(CACHE_RETENTION_DAYS)) {
                    warn!(error = %e, "Failed to evict old prayer times");
                }
                Ok(times)
            }
            Err(err) => {
                let fallback_key = cache_key(today - Duration::days(1));
                if let Some(entry) = self.read_entry(&fallback_key) {
                    warn!(error = %err, key = %fallback_key, "Prayer time fetch failed, serving previous day");
                    Ok(entry.times)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Reads an entry, treating undecodable values as a miss.
    fn read_entry(&self, key: &str) -> Option<CachedPrayerTimes> {
        match self.store.get_json::<CachedPrayerTimes>(key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, %key, "Ignoring unreadable prayer times entry");
                None
            }
        }
    }

    /// Removes entries for days before `cutoff`.
    fn evict_older_than(&self, cutoff: NaiveDate) -> PrayerResult<usize> {
        let mut evicted = 0;

        for key in self.store.keys_with_prefix(PRAYER_TIMES_PREFIX)? {
            let date = key
                .strip_prefix(PRAYER_TIMES_PREFIX)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

            // Keys that do not parse are leftovers from an older format.
            if date.map_or(true, |d| d < cutoff) {
                self.store.remove(&key)?;
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, "Evicted old prayer time entries");
        }
        Ok(evicted)
    }
}
