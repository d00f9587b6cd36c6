//! # daylux-adapter-http-reqwest
//!
//! HTTP adapters for the lookup ports, built on `reqwest`.
//!
//! - [`SunriseSunsetClient`] implements `SolarLookup` against the
//!   sunrise-sunset.org JSON API (`/json?formatted=0&lat=..&lng=..&date=..`).
//! - [`GeoIpClient`] implements `GeoLookup` against an IP geolocation service
//!   answering `{ "latitude": .., "longitude": .. }`.
//!
//! Both share one [`reqwest::Client`] with the configured request timeout.
//!
//! ## Dependency rule
//!
//! Depends on `daylux-app` (port traits) and `daylux-domain` only.

pub mod config;
pub mod error;
mod geoip;
mod sunrise_sunset;

pub use config::LookupConfig;
pub use error::HttpError;
pub use geoip::GeoIpClient;
pub use sunrise_sunset::SunriseSunsetClient;

/// Build the HTTP client shared by the lookup adapters.
///
/// # Errors
///
/// Returns [`HttpError::Request`] when the TLS backend cannot be initialised.
pub fn build_client(config: &LookupConfig) -> Result<reqwest::Client, HttpError> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("daylux/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
