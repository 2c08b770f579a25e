//! [`NotificationProvider`] adapters for values the Flutter side reports.
//!
//! Dart owns the notification plugins, so the core sees a provider that
//! replays the permission answer and token Dart already obtained, and one
//! that collects reminders for Dart to schedule.

use std::sync::Mutex;

use async_trait::async_trait;
use jamaat_core::platform::{
    LocalNotification, NotificationProvider, PermissionStatus, PlatformError, PlatformResult,
};

/// Replays a permission answer and push token obtained by the app.
#[derive(Debug)]
pub(crate) struct ReportedPush {
    pub granted: bool,
    pub token: Option<String>,
}

#[async_trait]
impl NotificationProvider for ReportedPush {
    async fn request_permission(&self) -> PermissionStatus {
        if self.granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn push_token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn schedule_local(&self, _notification: LocalNotification) -> PlatformResult<()> {
        Err(PlatformError::Unavailable("Local notifications".to_string()))
    }

    async fn cancel_all(&self) -> PlatformResult<()> {
        Ok(())
    }
}

/// Collects scheduled reminders instead of showing them.
#[derive(Debug, Default)]
pub(crate) struct CollectedReminders {
    scheduled: Mutex<Vec<LocalNotification>>,
}

impl CollectedReminders {
    pub fn take(&self) -> Vec<LocalNotification> {
        self.scheduled
            .lock()
            .map(|mut scheduled| std::mem::take(&mut *scheduled))
            .unwrap_or_default()
    }

    fn with_scheduled(&self, f: impl FnOnce(&mut Vec<LocalNotification>)) -> PlatformResult<()> {
        let mut scheduled = self
            .scheduled
            .lock()
            .map_err(|_| PlatformError::Unavailable("Reminder list".to_string()))?;
        f(&mut scheduled);
        Ok(())
    }
}

#[async_trait]
impl NotificationProvider for CollectedReminders {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn push_token(&self) -> Option<String> {
        None
    }

    async fn schedule_local(&self, notification: LocalNotification) -> PlatformResult<()> {
        self.with_scheduled(|scheduled| scheduled.push(notification))
    }

    async fn cancel_all(&self) -> PlatformResult<()> {
        self.with_scheduled(Vec::clear)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn reminder(id: &str) -> LocalNotification {
        LocalNotification {
            id: id.to_string(),
            title: "Asr".to_string(),
            body: "Asr is in 10 minutes".to_string(),
            fire_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(15, 20, 0)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn cancel_all_drops_earlier_reminders() {
        let collected = CollectedReminders::default();
        collected.schedule_local(reminder("a")).await.unwrap();
        collected.cancel_all().await.unwrap();
        collected.schedule_local(reminder("b")).await.unwrap();

        let taken = collected.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].id, "b");
        assert!(collected.take().is_empty());
    }

    #[tokio::test]
    async fn reported_push_replays_the_answer() {
        let denied = ReportedPush {
            granted: false,
            token: None,
        };
        assert_eq!(denied.request_permission().await, PermissionStatus::Denied);

        let granted = ReportedPush {
            granted: true,
            token: Some("device-token".to_string()),
        };
        assert!(granted.request_permission().await.is_granted());
        assert_eq!(granted.push_token().await.as_deref(), Some("device-token"));
    }
}
