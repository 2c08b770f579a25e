//! Prayer names and daily prayer time tables.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::clock::parse_clock_time;

/// A congregational prayer.
///
/// The five daily prayers have clock times computed from the sun's
/// position; Jumu'ah is the Friday congregational prayer and has no entry
/// in the daily table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    /// Dawn prayer.
    Fajr,
    /// Midday prayer.
    Dhuhr,
    /// Afternoon prayer.
    Asr,
    /// Sunset prayer.
    Maghrib,
    /// Night prayer.
    Isha,
    /// Friday congregational prayer.
    Jumuah,
}

impl PrayerName {
    /// The five daily prayers in the order they occur.
    pub const DAILY: [Self; 5] = [Self::Fajr, Self::Dhuhr, Self::Asr, Self::Maghrib, Self::Isha];

    /// Converts to the string used by the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fajr => "fajr",
            Self::Dhuhr => "dhuhr",
            Self::Asr => "asr",
            Self::Maghrib => "maghrib",
            Self::Isha => "isha",
            Self::Jumuah => "jumuah",
        }
    }

    /// Parses the backend string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fajr" => Some(Self::Fajr),
            "dhuhr" => Some(Self::Dhuhr),
            "asr" => Some(Self::Asr),
            "maghrib" => Some(Self::Maghrib),
            "isha" => Some(Self::Isha),
            "jumuah" => Some(Self::Jumuah),
            _ => None,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Fajr => "Fajr",
            Self::Dhuhr => "Dhuhr",
            Self::Asr => "Asr",
            Self::Maghrib => "Maghrib",
            Self::Isha => "Isha",
            Self::Jumuah => "Jumu'ah",
        }
    }
}

impl std::fmt::Display for PrayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One day's prayer clock times.
///
/// Computed externally from coordinates and immutable for a given
/// (date, approximate location) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerTimes {
    /// The calendar day these times were computed for.
    pub date: NaiveDate,
    /// Dawn prayer time.
    pub fajr: NaiveTime,
    /// Midday prayer time.
    pub dhuhr: NaiveTime,
    /// Afternoon prayer time.
    pub asr: NaiveTime,
    /// Sunset prayer time.
    pub maghrib: NaiveTime,
    /// Night prayer time.
    pub isha: NaiveTime,
}

impl PrayerTimes {
    /// Builds a table from `"HH:MM"` strings in daily order.
    ///
    /// Returns `None` if any value fails to parse.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use jamaat_core::prayer::PrayerTimes;
    ///
    /// let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    /// let times = PrayerTimes::from_clock_strings(
    ///     date,
    ///     ["05:40", "12:15", "15:30", "18:05", "19:25"],
    /// )
    /// .unwrap();
    /// assert_eq!(times.dhuhr.to_string(), "12:15:00");
    /// ```
    #[must_use]
    pub fn from_clock_strings(date: NaiveDate, values: [&str; 5]) -> Option<Self> {
        let [fajr, dhuhr, asr, maghrib, isha] = values;
        Some(Self {
            date,
            fajr: parse_clock_time(fajr)?,
            dhuhr: parse_clock_time(dhuhr)?,
            asr: parse_clock_time(asr)?,
            maghrib: parse_clock_time(maghrib)?,
            isha: parse_clock_time(isha)?,
        })
    }

    /// Clock time for `prayer`, or `None` for prayers outside the daily table.
    #[must_use]
    pub const fn time_for(&self, prayer: PrayerName) -> Option<NaiveTime> {
        match prayer {
            PrayerName::Fajr => Some(self.fajr),
            PrayerName::Dhuhr => Some(self.dhuhr),
            PrayerName::Asr => Some(self.asr),
            PrayerName::Maghrib => Some(self.maghrib),
            PrayerName::Isha => Some(self.isha),
            PrayerName::Jumuah => None,
        }
    }

    /// The five daily prayers with their clock times, in order.
    #[must_use]
    pub const fn entries(&self) -> [(PrayerName, NaiveTime); 5] {
        [
            (PrayerName::Fajr, self.fajr),
            (PrayerName::Dhuhr, self.dhuhr),
            (PrayerName::Asr, self.asr),
            (PrayerName::Maghrib, self.maghrib),
            (PrayerName::Isha, self.isha),
        ]
    }
}

/// The prayer whose time has most recently begun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPrayer {
    /// Which prayer.
    pub name: PrayerName,
    /// When it began. Before Fajr this is the previous day's Isha.
    pub started_at: NaiveDateTime,
}

/// The next prayer to begin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPrayer {
    /// Which prayer.
    pub name: PrayerName,
    /// When it begins. After Isha this is tomorrow's Fajr.
    pub at: NaiveDateTime,
    /// Countdown label, `"Hh Mm"` or `"Mm"`.
    pub time_until: String,
}
