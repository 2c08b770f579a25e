//! Client for the public prayer time calculation API (aladhan.com).
//!
//! Handles:
//! - Daily timings by Unix timestamp + coordinates
//! - Calculation method and juristic school selection
//! - Mapping non-OK answers to [`PrayerError`]

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use super::error::{PrayerError, PrayerResult};
use super::types::PrayerTimes;
use crate::config::PrayerApiConfig;
use crate::location::{round_coordinate, Coordinates};

/// Decimal places kept when sending coordinates to the API (~11 m).
const COORDINATE_PLACES: i32 = 4;

/// Source of daily prayer timetables.
#[async_trait]
pub trait PrayerTimesApi: Send + Sync {
    /// Fetches the timetable for `date` at `coords`.
    async fn fetch_timings(&self, coords: Coordinates, date: NaiveDate)
        -> PrayerResult<PrayerTimes>;
}

/// HTTP client for the Aladhan timings endpoint.
#[derive(Clone)]
pub struct AladhanClient {
    http: reqwest::Client,
    config: PrayerApiConfig,
}

impl AladhanClient {
    /// Creates a client using `config` for base URL, method and school.
    #[must_use]
    pub fn new(config: PrayerApiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Builds the request URL and query for a given day and location.
    ///
    /// The timestamp is noon UTC of `date` so the API resolves the same
    /// calendar day regardless of the device's offset.
    #[must_use]
    pub fn request_parts(
        &self,
        coords: Coordinates,
        date: NaiveDate,
    ) -> (String, Vec<(&'static str, String)>) {
        let timestamp = date
            .and_hms_opt(12, 0, 0)
            .map_or(0, |noon| noon.and_utc().timestamp());

        let url = format!(
            "{}/timings/{timestamp}",
            self.config.base_url.trim_end_matches('/')
        );
        let query = vec![
            (
                "latitude",
                round_coordinate(coords.latitude, COORDINATE_PLACES).to_string(),
            ),
            (
                "longitude",
                round_coordinate(coords.longitude, COORDINATE_PLACES).to_string(),
            ),
            ("method", self.config.method.to_string()),
            ("school", self.config.school.to_string()),
        ];

        (url, query)
    }
}

#[async_trait]
impl PrayerTimesApi for AladhanClient {
    async fn fetch_timings(
        &self,
        coords: Coordinates,
        date: NaiveDate,
    ) -> PrayerResult<PrayerTimes> {
        let (url, query) = self.request_parts(coords, date);

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| PrayerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrayerError::Api {
                code: status.as_u16(),
                status: body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PrayerError::Network(e.to_string()))?;

        parse_timings_response(&body, date)
    }
}

#[derive(Debug, Deserialize)]
struct TimingsResponse {
    code: u16,
    status: String,
    /// An object on success; error answers carry a message string here.
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: Timings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Timings {
    fajr: String,
    dhuhr: String,
    asr: String,
    maghrib: String,
    isha: String,
}

/// Decodes an Aladhan timings body into a [`PrayerTimes`] for `date`.
///
/// # Errors
///
/// Returns [`PrayerError::Api`] when `code`/`status` are not 200/OK and
/// [`PrayerError::InvalidResponse`] when the body or a clock time is malformed.
pub fn parse_timings_response(body: &str, date: NaiveDate) -> PrayerResult<PrayerTimes> {
    let parsed: TimingsResponse =
        serde_json::from_str(body).map_err(|e| PrayerError::InvalidResponse(e.to_string()))?;

    if parsed.code != 200 || parsed.status != "OK" {
        return Err(PrayerError::Api {
            code: parsed.code,
            status: parsed.status,
        });
    }

    let data = parsed
        .data
        .ok_or_else(|| PrayerError::InvalidResponse("missing data".to_string()))?;
    let timings = serde_json::from_value::<TimingsData>(data)
        .map_err(|e| PrayerError::InvalidResponse(e.to_string()))?
        .timings;

    PrayerTimes::from_clock_strings(
        date,
        [
            timings.fajr.as_str(),
            timings.dhuhr.as_str(),
            timings.asr.as_str(),
            timings.maghrib.as_str(),
            timings.isha.as_str(),
        ],
    )
    .ok_or_else(|| PrayerError::InvalidResponse("unparsable clock time".to_string()))
}
