//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `daylux.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use daylux_adapter_http_reqwest::LookupConfig;
use daylux_adapter_ping::ProbeConfig;
use daylux_app::ControllerSettings;
use daylux_domain::solar::Coordinates;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Loop periods and shutdown behaviour.
    pub controller: ControllerConfig,
    /// Fixed location, if geolocation should not be used.
    pub location: LocationConfig,
    /// Solar and geolocation services.
    pub lookup: LookupConfig,
    /// Device reachability probing.
    pub probe: ProbeConfig,
    /// Where the lighting policy lives.
    pub policy: PolicyConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Simulated bulbs.
    #[serde(rename = "virtual")]
    pub virtual_bulbs: VirtualConfig,
}

/// Control loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds between two policy applications.
    pub apply_light_policy_interval_secs: u64,
    /// Seconds between two presence detection rounds.
    pub device_detection_interval_secs: u64,
    /// Failed probe attempts before a device counts as offline.
    pub device_offline_delay: u32,
    /// Seconds a loop may take to stop before it is aborted.
    pub shutdown_timeout_secs: u64,
    /// Seconds before a stopped bulb listener is restarted.
    pub discovery_retry_secs: u64,
}

/// Location configuration. Both coordinates or neither.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Seconds between two failed geolocation attempts.
    pub geo_retry_secs: u64,
}

/// Policy file configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Path of the JSON policy document.
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Simulated bulb network.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VirtualConfig {
    /// One switched-off bulb is simulated per address.
    pub bulbs: Vec<IpAddr>,
}

impl Config {
    /// Load configuration from `daylux.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("daylux.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("DAYLUX_POLICY") {
            self.policy.path = PathBuf::from(val);
        }
        if let Some(val) = var("DAYLUX_LATITUDE")
            && let Ok(latitude) = val.parse()
        {
            self.location.latitude = Some(latitude);
        }
        if let Some(val) = var("DAYLUX_LONGITUDE")
            && let Ok(longitude) = val.parse()
        {
            self.location.longitude = Some(longitude);
        }
        if let Some(val) = var("DAYLUX_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let controller = &self.controller;
        if controller.apply_light_policy_interval_secs == 0
            || controller.device_detection_interval_secs == 0
            || controller.discovery_retry_secs == 0
        {
            return Err(ConfigError::Validation(
                "controller intervals must be non-zero".to_string(),
            ));
        }
        if controller.device_offline_delay == 0 {
            return Err(ConfigError::Validation(
                "device_offline_delay must be at least 1".to_string(),
            ));
        }
        if self.lookup.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "lookup timeout must be non-zero".to_string(),
            ));
        }
        match (self.location.latitude, self.location.longitude) {
            (Some(latitude), Some(longitude)) => {
                if !Coordinates::new(latitude, longitude).is_valid() {
                    return Err(ConfigError::Validation(format!(
                        "coordinates {latitude},{longitude} are out of range"
                    )));
                }
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Validation(
                    "latitude and longitude must be set together".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Fixed coordinates, when configured.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.location.latitude, self.location.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }

    /// Controller tunables derived from this configuration.
    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        let controller = &self.controller;
        ControllerSettings {
            apply_interval: Duration::from_secs(controller.apply_light_policy_interval_secs),
            detection_interval: Duration::from_secs(controller.device_detection_interval_secs),
            offline_delay: controller.device_offline_delay,
            shutdown_timeout: Duration::from_secs(controller.shutdown_timeout_secs),
            discovery_retry: Duration::from_secs(controller.discovery_retry_secs),
            geo_retry: Duration::from_secs(self.location.geo_retry_secs),
            coordinates: self.coordinates(),
            ..ControllerSettings::default()
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            apply_light_policy_interval_secs: 10,
            device_detection_interval_secs: 10,
            device_offline_delay: 10,
            shutdown_timeout_secs: 5,
            discovery_retry_secs: 30,
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            geo_retry_secs: 5,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("policy.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "dayluxd=info,daylux=info".to_string(),
            file: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
