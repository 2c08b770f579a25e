//! Clock-time parsing and display formatting.
//!
//! Prayer times arrive as 24-hour `"HH:MM"` strings; the UI shows 12-hour
//! labels, countdowns, and day headers. All helpers here are pure and take
//! "now" explicitly so they can be tested at fixed instants.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Parses a 24-hour `"HH:MM"` clock time.
///
/// A trailing timezone annotation such as `"05:12 (EST)"` is ignored.
///
/// # Examples
///
/// ```
/// use jamaat_core::clock::parse_clock_time;
///
/// let t = parse_clock_time("05:12 (EST)").unwrap();
/// assert_eq!(t.to_string(), "05:12:00");
/// assert!(parse_clock_time("25:00").is_none());
/// ```
#[must_use]
pub fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    let clock = value.split_whitespace().next()?;
    NaiveTime::parse_from_str(clock, "%H:%M").ok()
}

/// Formats a 24-hour clock string as a 12-hour label.
///
/// Input that cannot be parsed is returned unchanged.
///
/// # Examples
///
/// ```
/// use jamaat_core::clock::format_prayer_time;
///
/// assert_eq!(format_prayer_time("00:00"), "12:00 AM");
/// assert_eq!(format_prayer_time("13:05"), "1:05 PM");
/// assert_eq!(format_prayer_time("12:30"), "12:30 PM");
/// ```
#[must_use]
pub fn format_prayer_time(value: &str) -> String {
    parse_clock_time(value).map_or_else(|| value.to_string(), format_time_12h)
}

/// Formats a [`NaiveTime`] as `"h:MM AM"`.
#[must_use]
pub fn format_time_12h(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Formats a countdown as `"Hh Mm"`, or `"Mm"` when under an hour.
///
/// Seconds are truncated, so the label never overstates the remaining time.
/// Negative durations are shown as `"0m"`.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use jamaat_core::clock::format_time_until;
///
/// assert_eq!(format_time_until(Duration::minutes(125)), "2h 5m");
/// assert_eq!(format_time_until(Duration::seconds(59 * 60 + 59)), "59m");
/// ```
#[must_use]
pub fn format_time_until(remaining: Duration) -> String {
    let total_minutes = remaining.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Header label for the day a session falls on.
#[must_use]
pub fn format_session_day(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.succ_opt() == Some(date) {
        "Tomorrow".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else {
        format!("{}, {}", date.weekday(), date.format("%b %-d"))
    }
}

/// Short relative label for a session start, e.g. `"in 1h 5m"` or
/// `"started 3m ago"`.
#[must_use]
pub fn format_relative(target: NaiveDateTime, now: NaiveDateTime) -> String {
    let delta = target - now;
    if delta >= Duration::zero() {
        if delta.num_minutes() == 0 {
            "now".to_string()
        } else {
            format!("in {}", format_time_until(delta))
        }
    } else {
        format!("started {} ago", format_time_until(-delta))
    }
}
