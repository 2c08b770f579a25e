//! Device capabilities the core calls into.
//!
//! Location, push registration, and local notifications are implemented
//! by the host app and injected at startup as trait objects; nothing here
//! registers process-wide handlers.

mod error;
mod reminders;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use error::{PlatformError, PlatformResult};
pub use reminders::{plan_reminders, PrayerReminderScheduler};

use crate::location::Coordinates;

/// Answer to a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Undetermined,
}

impl PermissionStatus {
    /// Whether the capability may be used.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Foreground location.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Asks for foreground location permission.
    async fn request_permission(&self) -> PermissionStatus;

    /// The device's current position.
    async fn current_position(&self) -> PlatformResult<Coordinates>;
}

/// A local notification to show at a wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNotification {
    /// Stable id so rescheduling replaces rather than duplicates.
    pub id: String,
    pub title: String,
    pub body: String,
    pub fire_at: NaiveDateTime,
}

/// Push registration and local notifications.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Asks for notification permission.
    async fn request_permission(&self) -> PermissionStatus;

    /// The device push token, if registration succeeded.
    async fn push_token(&self) -> Option<String>;

    /// Schedules a local notification.
    async fn schedule_local(&self, notification: LocalNotification) -> PlatformResult<()>;

    /// Cancels every scheduled local notification.
    async fn cancel_all(&self) -> PlatformResult<()>;
}
