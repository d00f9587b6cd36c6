//! Solar events, coordinates and the per-day table of solar times.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// A named astronomical event that rule markers may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarEvent {
    Sunrise,
    Sunset,
    CivilTwilightBegin,
    CivilTwilightEnd,
}

impl SolarEvent {
    /// Every event, in the order a day sees them.
    pub const ALL: [Self; 4] = [
        Self::CivilTwilightBegin,
        Self::Sunrise,
        Self::Sunset,
        Self::CivilTwilightEnd,
    ];

    /// The marker name used in policy documents and lookup responses.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sunrise => "sunrise",
            Self::Sunset => "sunset",
            Self::CivilTwilightBegin => "civil_twilight_begin",
            Self::CivilTwilightEnd => "civil_twilight_end",
        }
    }
}

impl fmt::Display for SolarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name is not one of the [`SolarEvent`] markers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown solar event {0:?}")]
pub struct UnknownSolarEvent(pub String);

impl FromStr for SolarEvent {
    type Err = UnknownSolarEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownSolarEvent(s.to_string()))
    }
}

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within their ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.latitude, self.longitude)
    }
}

/// Solar events for one date and location, as UTC instants.
///
/// This is what lookup services answer with; see [`UtcSolarTimes::to_local`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtcSolarTimes {
    pub date: NaiveDate,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub civil_twilight_begin: DateTime<Utc>,
    pub civil_twilight_end: DateTime<Utc>,
}

impl UtcSolarTimes {
    /// Convert every event into the local zone.
    #[must_use]
    pub fn to_local(&self) -> SolarTimes {
        SolarTimes {
            date: self.date,
            sunrise: self.sunrise.with_timezone(&Local),
            sunset: self.sunset.with_timezone(&Local),
            civil_twilight_begin: self.civil_twilight_begin.with_timezone(&Local),
            civil_twilight_end: self.civil_twilight_end.with_timezone(&Local),
        }
    }
}

/// Solar events for one date and location, in local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolarTimes {
    pub date: NaiveDate,
    pub sunrise: Timestamp,
    pub sunset: Timestamp,
    pub civil_twilight_begin: Timestamp,
    pub civil_twilight_end: Timestamp,
}

impl SolarTimes {
    /// Instant of the given event.
    #[must_use]
    pub fn get(&self, event: SolarEvent) -> Timestamp {
        match event {
            SolarEvent::Sunrise => self.sunrise,
            SolarEvent::Sunset => self.sunset,
            SolarEvent::CivilTwilightBegin => self.civil_twilight_begin,
            SolarEvent::CivilTwilightEnd => self.civil_twilight_end,
        }
    }
}
