//! Cached university list and prayer space lookup.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::types::{CachedUniversities, PrayerSpace, University};
use crate::backend::{Backend, BackendResult};
use crate::storage::{LocalStore, UNIVERSITIES_KEY};

/// How long the cached university list is served without refetching.
pub const UNIVERSITIES_TTL_DAYS: i64 = 7;

/// Reference data for onboarding and the create-session form.
pub struct UniversityDirectory {
    backend: Arc<dyn Backend>,
    store: Arc<LocalStore>,
}

impl UniversityDirectory {
    /// Creates a directory backed by `store`.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, store: Arc<LocalStore>) -> Self {
        Self { backend, store }
    }

    /// Active universities, from the weekly cache when possible.
    ///
    /// # Errors
    ///
    /// The fetch error when there is no cached list to fall back on.
    pub async fn universities(&self) -> BackendResult<Vec<University>> {
        self.universities_at(Utc::now()).await
    }

    /// [`universities`](Self::universities) at an explicit `now`.
    ///
    /// # Errors
    ///
    /// As [`universities`](Self::universities).
    pub async fn universities_at(&self, now: DateTime<Utc>) -> BackendResult<Vec<University>> {
        let cached = self.read_cache();

        if let Some(cache) = &cached {
            if now - cache.fetched_at < Duration::days(UNIVERSITIES_TTL_DAYS) {
                debug!(count = cache.universities.len(), "University cache hit");
                return Ok(cache.universities.clone());
            }
        }

        match self.backend.fetch_universities().await {
            Ok(universities) => {
                let entry = CachedUniversities {
                    universities: universities
                        .into_iter()
                        .filter(|u| u.is_active)
                        .collect(),
                    fetched_at: now,
                };
                if let Err(e) = self.store.set_json(UNIVERSITIES_KEY, &entry) {
                    warn!(error = %e, "Failed to cache universities");
                }
                info!(count = entry.universities.len(), "Fetched universities");
                Ok(entry.universities)
            }
            Err(e) => match cached {
                Some(cache) => {
                    warn!(error = %e, "University fetch failed, serving stale list");
                    Ok(cache.universities)
                }
                None => Err(e),
            },
        }
    }

    /// Verified prayer spaces, optionally limited to one university.
    ///
    /// # Errors
    ///
    /// Backend errors.
    pub async fn prayer_spaces(
        &self,
        university_id: Option<&str>,
    ) -> BackendResult<Vec<PrayerSpace>> {
        let spaces = self.backend.fetch_prayer_spaces(university_id).await?;
        Ok(spaces.into_iter().filter(|s| s.is_verified).collect())
    }

    /// Looks up a university by id in the cached list.
    ///
    /// # Errors
    ///
    /// As [`universities`](Self::universities).
    pub async fn university(&self, id: &str) -> BackendResult<Option<University>> {
        Ok(self
            .universities()
            .await?
            .into_iter()
            .find(|u| u.id == id))
    }

    fn read_cache(&self) -> Option<CachedUniversities> {
        match self.store.get_json::<CachedUniversities>(UNIVERSITIES_KEY) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable university cache");
                None
            }
        }
    }
}

impl std::fmt::Debug for UniversityDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniversityDirectory").finish_non_exhaustive()
    }
}
