//! Prayer sessions and the nearby feed.
//!
//! # Architecture
//!
//! ```text
//! SessionStore (async, talks to the Backend)
//!     ├── SessionFeed (pure state: window, pages, optimistic updates)
//!     └── validate_create_session (form rules)
//! ```
//!
//! Locks on the feed are never held across a backend call; concurrent
//! refreshes resolve last-write-wins.

mod error;
pub mod feed;
mod store;
pub mod types;
pub mod validation;

pub use error::{SessionError, SessionResult};
pub use feed::{Rollback, SessionFeed};
pub use store::SessionStore;
pub use types::{
    AttendeeProfile, CreateSessionInput, FeedEntry, FeedPatch, LocationType, PrayerSession,
    SessionChange, SessionLocation,
};
pub use validation::{validate_create_session, ValidSession, MAX_LABEL_LEN, MAX_NOTES_LEN};
