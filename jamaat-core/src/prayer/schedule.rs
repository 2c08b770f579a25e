//! Current/next prayer derivation and session time suggestions.
//!
//! The `*_at` functions take "now" as a local wall-clock time and only use
//! the clock times of the table, so a table fetched for today can be
//! evaluated at any instant of the day.

use chrono::{Duration, Local, NaiveDateTime};

use super::types::{CurrentPrayer, NextPrayer, PrayerName, PrayerTimes};
use crate::clock::format_time_until;

/// Returns the prayer whose time most recently began at `now`.
///
/// A prayer whose clock time equals `now` is current. Before Fajr the
/// current prayer is the previous day's Isha.
#[must_use]
pub fn current_prayer_at(times: &PrayerTimes, now: NaiveDateTime) -> CurrentPrayer {
    let today = now.date();

    times
        .entries()
        .iter()
        .rev()
        .map(|(name, time)| (*name, today.and_time(*time)))
        .find(|(_, start)| *start <= now)
        .map_or_else(
            || CurrentPrayer {
                name: PrayerName::Isha,
                started_at: (today - Duration::days(1)).and_time(times.isha),
            },
            |(name, started_at)| CurrentPrayer { name, started_at },
        )
}

/// Returns the first prayer strictly after `now`.
///
/// After Isha the next prayer is tomorrow's Fajr, using today's Fajr time
/// as the estimate.
#[must_use]
pub fn next_prayer_at(times: &PrayerTimes, now: NaiveDateTime) -> NextPrayer {
    let today = now.date();

    let (name, at) = times
        .entries()
        .iter()
        .map(|(name, time)| (*name, today.and_time(*time)))
        .find(|(_, start)| *start > now)
        .unwrap_or_else(|| (PrayerName::Fajr, (today + Duration::days(1)).and_time(times.fajr)));

    NextPrayer {
        name,
        at,
        time_until: format_time_until(at - now),
    }
}

/// Suggests a start time for a new session of `prayer`.
///
/// Today's clock time is used if it has not passed yet, otherwise the same
/// clock time tomorrow. Prayers outside the daily table (Jumu'ah) get `now`.
#[must_use]
pub fn suggest_prayer_time_at(
    times: &PrayerTimes,
    prayer: PrayerName,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let Some(time) = times.time_for(prayer) else {
        return now;
    };

    let today = now.date().and_time(time);
    if today < now {
        today + Duration::days(1)
    } else {
        today
    }
}

/// [`current_prayer_at`] evaluated at the device's local time.
#[must_use]
pub fn get_current_prayer(times: &PrayerTimes) -> CurrentPrayer {
    current_prayer_at(times, Local::now().naive_local())
}

/// [`next_prayer_at`] evaluated at the device's local time.
#[must_use]
pub fn get_next_prayer(times: &PrayerTimes) -> NextPrayer {
    next_prayer_at(times, Local::now().naive_local())
}

/// [`suggest_prayer_time_at`] evaluated at the device's local time.
#[must_use]
pub fn suggest_prayer_time(times: &PrayerTimes, prayer: PrayerName) -> NaiveDateTime {
    suggest_prayer_time_at(times, prayer, Local::now().naive_local())
}
