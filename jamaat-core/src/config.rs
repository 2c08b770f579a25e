//! Core configuration supplied by the host app at startup.
//!
//! The Flutter side passes a JSON document; every section has defaults so
//! only the backend credentials are strictly required.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::{DEFAULT_RADIUS_M, MAX_RADIUS_M, MIN_RADIUS_M};

/// Backend (auth + data + realtime) endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public anonymous API key.
    pub anon_key: String,
}

/// Prayer time calculation API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrayerApiConfig {
    /// API base URL.
    pub base_url: String,
    /// Calculation method id (2 = Islamic Society of North America).
    pub method: u8,
    /// Juristic school for Asr (0 = Shafi'i, 1 = Hanafi).
    pub school: u8,
}

impl Default for PrayerApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.aladhan.com/v1".to_string(),
            method: 2,
            school: 0,
        }
    }
}

/// Nearby feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Radius used until the user picks another, in meters.
    pub default_radius_m: u32,
    /// Rows per page requested from the radius query.
    pub page_size: u32,
    /// How long a started session stays visible, in minutes.
    pub past_grace_minutes: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_radius_m: DEFAULT_RADIUS_M,
            page_size: 20,
            past_grace_minutes: 15,
        }
    }
}

/// Local prayer reminder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Minutes before each prayer to remind.
    pub minutes_before: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { minutes_before: 15 }
    }
}

/// Complete core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Backend endpoint and key.
    pub backend: BackendConfig,
    /// Prayer time API.
    #[serde(default)]
    pub prayer_api: PrayerApiConfig,
    /// Feed behaviour.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Prayer reminders.
    #[serde(default)]
    pub reminders: ReminderConfig,
    /// `tracing` filter directive, e.g. `"jamaat_core=debug"`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "jamaat_core=info".to_string()
}

impl CoreConfig {
    /// Creates a config for the given backend with all other sections at
    /// their defaults.
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                url: url.into(),
                anon_key: anon_key.into(),
            },
            prayer_api: PrayerApiConfig::default(),
            feed: FeedConfig::default(),
            reminders: ReminderConfig::default(),
            log_filter: default_log_filter(),
        }
    }

    /// Parses and validates a JSON config document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that required values are present and ranges are sane.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Missing("backend.url"));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing("backend.anon_key"));
        }
        if !(MIN_RADIUS_M..=MAX_RADIUS_M).contains(&self.feed.default_radius_m) {
            return Err(ConfigError::Invalid {
                field: "feed.default_radius_m",
                reason: format!("must be between {MIN_RADIUS_M} and {MAX_RADIUS_M}"),
            });
        }
        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "feed.page_size",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The document is not valid JSON for [`CoreConfig`].
    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A required value is empty.
    #[error("Missing required config value: {0}")]
    Missing(&'static str),

    /// A value is out of range.
    #[error("Invalid config value {field}: {reason}")]
    Invalid {
        /// Dotted path of the field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
