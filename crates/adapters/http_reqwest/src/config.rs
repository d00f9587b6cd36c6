//! Lookup service configuration.

use std::time::Duration;

use serde::Deserialize;

/// Where and how to reach the lookup services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Base URL of the sunrise-sunset API, without the `/json` path.
    pub solar_base_url: String,
    /// Full URL of the IP geolocation endpoint.
    pub geo_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            solar_base_url: "https://api.sunrise-sunset.org".to_string(),
            geo_url: "https://ipapi.co/json/".to_string(),
            timeout_secs: 3,
        }
    }
}

impl LookupConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
