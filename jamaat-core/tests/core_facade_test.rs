//! Integration tests for reference data, prayer times and device
//! capabilities through the core facade.

mod helpers;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use helpers::{
    north_of_campus, FakeBackend, FakePrayerApi, FixedLocation, RecordingNotifications, CAMPUS,
};
use jamaat_core::platform::PermissionStatus;
use jamaat_core::prayer::{current_prayer_at, next_prayer_at, PrayerName};
use jamaat_core::university::UNIVERSITIES_TTL_DAYS;
use jamaat_core::{CoreError, ErrorKind};

fn march_7(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 7)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn fetch_count(backend: &FakeBackend) -> usize {
    backend
        .calls()
        .iter()
        .filter(|c| c.as_str() == "fetch_universities")
        .count()
}

#[tokio::test]
async fn universities_are_cached_for_a_week() {
    let backend = FakeBackend::new();
    backend.add_university("uoft", "University of Toronto", true);
    backend.add_university("closed", "Closed College", false);
    let core = helpers::core(&backend, &FakePrayerApi::new());

    let list = core.universities().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, "uoft");

    core.universities().await.unwrap();
    assert_eq!(fetch_count(&backend), 1);

    let later = Utc::now() + Duration::days(UNIVERSITIES_TTL_DAYS) + Duration::hours(1);
    core.directory().universities_at(later).await.unwrap();
    assert_eq!(fetch_count(&backend), 2);
}

#[tokio::test]
async fn stale_universities_served_when_offline() {
    let backend = FakeBackend::new();
    backend.add_university("uoft", "University of Toronto", true);
    let core = helpers::core(&backend, &FakePrayerApi::new());
    core.universities().await.unwrap();

    backend.set_offline(true);
    let later = Utc::now() + Duration::days(UNIVERSITIES_TTL_DAYS + 3);
    let list = core.directory().universities_at(later).await.unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn universities_fail_offline_without_cache() {
    let backend = FakeBackend::new();
    backend.set_offline(true);
    let core = helpers::core(&backend, &FakePrayerApi::new());

    let err = core.universities().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.is_transient());
}

#[tokio::test]
async fn only_verified_prayer_spaces_are_listed() {
    let backend = FakeBackend::new();
    backend.add_prayer_space("p1", "MSA Room", north_of_campus(100.0), true);
    backend.add_prayer_space("p2", "Unverified Corner", north_of_campus(200.0), false);
    let core = helpers::core(&backend, &FakePrayerApi::new());

    let spaces = core.prayer_spaces(Some("uoft")).await.unwrap();
    let ids: Vec<&str> = spaces.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["p1"]);
}

#[tokio::test]
async fn prayer_times_are_cached_per_day_and_area() {
    let backend = FakeBackend::new();
    let prayer_api = FakePrayerApi::new();
    let core = helpers::core(&backend, &prayer_api);

    let times = core.prayer_times_at(CAMPUS, march_7(9, 0)).await.unwrap();
    assert_eq!(times.date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
    core.prayer_times_at(north_of_campus(1_000.0), march_7(13, 0))
        .await
        .unwrap();
    assert_eq!(prayer_api.calls(), 1);

    // Too far from the cached position.
    core.prayer_times_at(north_of_campus(20_000.0), march_7(13, 0))
        .await
        .unwrap();
    assert_eq!(prayer_api.calls(), 2);

    let current = current_prayer_at(&times, march_7(16, 0));
    let next = next_prayer_at(&times, march_7(16, 0));
    assert_eq!(current.name, PrayerName::Asr);
    assert_eq!(next.name, PrayerName::Maghrib);
    assert_eq!(next.time_until, "2h 5m");
}

#[tokio::test]
async fn previous_day_served_when_fetch_fails() {
    let backend = FakeBackend::new();
    let prayer_api = FakePrayerApi::new();
    let core = helpers::core(&backend, &prayer_api);
    core.prayer_times_at(CAMPUS, march_7(22, 0)).await.unwrap();

    prayer_api.set_failing(true);
    let next_morning = march_7(22, 0) + Duration::hours(10);
    let times = core.prayer_times_at(CAMPUS, next_morning).await.unwrap();
    assert_eq!(times.date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());

    let two_days_later = march_7(9, 0) + Duration::days(2);
    let err = core.prayer_times_at(CAMPUS, two_days_later).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn location_requires_permission() {
    let backend = FakeBackend::new();
    let core = helpers::core(&backend, &FakePrayerApi::new());

    let denied = FixedLocation {
        permission: PermissionStatus::Denied,
        position: CAMPUS,
    };
    let err = core.current_location(&denied).await.unwrap_err();
    assert!(matches!(err, CoreError::PermissionDenied("location")));
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let granted = FixedLocation {
        permission: PermissionStatus::Granted,
        position: CAMPUS,
    };
    assert_eq!(core.current_location(&granted).await.unwrap(), CAMPUS);
}

#[tokio::test]
async fn reminders_cover_the_rest_of_the_day() {
    let backend = FakeBackend::new();
    let prayer_api = FakePrayerApi::new();
    let core = helpers::core(&backend, &prayer_api);
    let times = core.prayer_times_at(CAMPUS, march_7(9, 0)).await.unwrap();
    let notifications = RecordingNotifications::granted(None);

    let count = core
        .schedule_prayer_reminders(notifications.clone(), &times, march_7(15, 20))
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        notifications.scheduled_ids(),
        vec![
            "prayer-reminder-maghrib-2025-03-07",
            "prayer-reminder-isha-2025-03-07"
        ]
    );

    // Rescheduling replaces rather than duplicates.
    core.schedule_prayer_reminders(notifications.clone(), &times, march_7(15, 20))
        .await
        .unwrap();
    assert_eq!(notifications.scheduled_ids().len(), 2);
}

#[tokio::test]
async fn feed_radius_defaults_to_config() {
    let backend = FakeBackend::new();
    let prayer_api = FakePrayerApi::new();
    let core = helpers::signed_in_core(&backend, &prayer_api, "sara@example.com").await;
    let now = Utc::now();
    backend.seed_session("near", north_of_campus(4_000.0), now + Duration::hours(1), "u2");

    assert_eq!(core.fetch_nearby(CAMPUS, None).await.unwrap().len(), 1);
    assert_eq!(core.sessions().radius_m().await, 5_000);

    assert!(core.fetch_nearby(CAMPUS, Some(1_000)).await.unwrap().is_empty());
    assert_eq!(core.sessions().radius_m().await, 1_000);
}
