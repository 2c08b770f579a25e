//! Universities and prayer spaces.

mod directory;
pub mod types;

pub use directory::{UniversityDirectory, UNIVERSITIES_TTL_DAYS};
pub use types::{CachedUniversities, PrayerSpace, University};
