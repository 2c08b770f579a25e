//! Device-local persistence.
//!
//! A single `SQLite` key-value table holds every cached or queued blob the
//! core keeps between launches. The keys are fixed:
//!
//! | Key                        | Contents                          |
//! |----------------------------|-----------------------------------|
//! | `prayer_times:<date>`      | one day's prayer times + origin   |
//! | `universities`             | university list + fetch time      |
//! | `offline_queue`            | pending offline actions, in order |
//! | `auth_session`             | the signed-in session             |

mod error;
mod store;

pub use error::{Result, StorageError};
pub use store::LocalStore;

/// Key prefix for per-day prayer time entries.
pub const PRAYER_TIMES_PREFIX: &str = "prayer_times:";

/// Key for the cached university list.
pub const UNIVERSITIES_KEY: &str = "universities";

/// Key for the offline action queue.
pub const OFFLINE_QUEUE_KEY: &str = "offline_queue";

/// Key for the persisted auth session.
pub const AUTH_SESSION_KEY: &str = "auth_session";
