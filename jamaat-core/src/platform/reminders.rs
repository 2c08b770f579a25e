//! Local prayer time reminders.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use super::{LocalNotification, NotificationProvider, PlatformResult};
use crate::clock::format_time_12h;
use crate::prayer::{PrayerName, PrayerTimes};

/// Reminders for the prayers of `times` whose reminder time is still
/// ahead of `now`.
#[must_use]
pub fn plan_reminders(
    times: &PrayerTimes,
    now: NaiveDateTime,
    minutes_before: u32,
) -> Vec<LocalNotification> {
    let lead = Duration::minutes(i64::from(minutes_before));

    times
        .entries()
        .into_iter()
        .filter_map(|(prayer, time)| {
            let at = times.date.and_time(time);
            let fire_at = at - lead;
            (fire_at > now).then(|| reminder(prayer, at, fire_at, minutes_before, times))
        })
        .collect()
}

fn reminder(
    prayer: PrayerName,
    at: NaiveDateTime,
    fire_at: NaiveDateTime,
    minutes_before: u32,
    times: &PrayerTimes,
) -> LocalNotification {
    LocalNotification {
        id: format!("prayer-reminder-{}-{}", prayer.as_str(), times.date),
        title: format!("{} in {minutes_before} minutes", prayer.display_name()),
        body: format!(
            "{} begins at {}",
            prayer.display_name(),
            format_time_12h(at.time())
        ),
        fire_at,
    }
}

/// Keeps one reminder scheduled per remaining prayer of the day.
pub struct PrayerReminderScheduler {
    notifications: Arc<dyn NotificationProvider>,
    minutes_before: u32,
}

impl PrayerReminderScheduler {
    /// Creates a scheduler that reminds `minutes_before` each prayer.
    #[must_use]
    pub fn new(notifications: Arc<dyn NotificationProvider>, minutes_before: u32) -> Self {
        Self {
            notifications,
            minutes_before,
        }
    }

    /// Replaces all scheduled reminders with those for the rest of the day.
    ///
    /// Returns the number scheduled.
    ///
    /// # Errors
    ///
    /// The first provider error.
    pub async fn schedule_day(&self, times: &PrayerTimes, now: NaiveDateTime) -> PlatformResult<usize> {
        self.notifications.cancel_all().await?;

        let planned = plan_reminders(times, now, self.minutes_before);
        let count = planned.len();
        for notification in planned {
            debug!(id = %notification.id, fire_at = %notification.fire_at, "Scheduling reminder");
            self.notifications.schedule_local(notification).await?;
        }

        info!(count, date = %times.date, "Prayer reminders scheduled");
        Ok(count)
    }

    /// Removes every scheduled reminder.
    ///
    /// # Errors
    ///
    /// Provider errors.
    pub async fn cancel_all(&self) -> PlatformResult<()> {
        self.notifications.cancel_all().await
    }
}

impl std::fmt::Debug for PrayerReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrayerReminderScheduler")
            .field("minutes_before", &self.minutes_before)
            .finish_non_exhaustive()
    }
}
