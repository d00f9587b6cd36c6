//! Solar lookup against the sunrise-sunset.org JSON API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use daylux_app::ports::SolarLookup;
use daylux_domain::error::LookupError;
use daylux_domain::solar::{Coordinates, UtcSolarTimes};

use crate::error::HttpError;

const OK_STATUS: &str = "OK";

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    /// An object on success, an empty string on most failures.
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Results {
    sunrise: Option<String>,
    sunset: Option<String>,
    civil_twilight_begin: Option<String>,
    civil_twilight_end: Option<String>,
}

/// Client for `GET {base}/json?formatted=0&lat=..&lng=..&date=YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub struct SunriseSunsetClient {
    client: reqwest::Client,
    base_url: String,
}

impl SunriseSunsetClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn request(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
    ) -> Result<UtcSolarTimes, HttpError> {
        let url = format!("{}/json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("formatted", "0".to_string()),
                ("lat", coordinates.latitude.to_string()),
                ("lng", coordinates.longitude.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status));
        }
        let body = response.text().await?;
        let envelope: Envelope = serde_json::from_str(&body).map_err(HttpError::Body)?;
        if envelope.status != OK_STATUS {
            return Err(HttpError::Service(envelope.status));
        }

        let results: Results = serde_json::from_value(envelope.results).map_err(HttpError::Body)?;
        Ok(UtcSolarTimes {
            date,
            sunrise: instant(results.sunrise.as_deref(), "sunrise")?,
            sunset: instant(results.sunset.as_deref(), "sunset")?,
            civil_twilight_begin: instant(
                results.civil_twilight_begin.as_deref(),
                "civil_twilight_begin",
            )?,
            civil_twilight_end: instant(results.civil_twilight_end.as_deref(), "civil_twilight_end")?,
        })
    }
}

fn instant(value: Option<&str>, field: &'static str) -> Result<DateTime<Utc>, HttpError> {
    value
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|instant| instant.with_timezone(&Utc))
        .ok_or(HttpError::Field(field))
}

impl SolarLookup for SunriseSunsetClient {
    #[tracing::instrument(skip(self))]
    async fn fetch(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
    ) -> Result<UtcSolarTimes, LookupError> {
        let times = self.request(date, coordinates).await?;
        tracing::debug!(?times, "sunrise-sunset answered");
        Ok(times)
    }
}
