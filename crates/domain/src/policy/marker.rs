//! Marker: one end of a rule's time window, as written in a policy document.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::solar::{SolarEvent, SolarTimes};
use crate::time::{self, Timestamp};

const CLOCK_FORMAT: &str = "%H:%M:%S";

/// A window boundary before it is placed on a concrete day.
///
/// Parsed once when the document is read: a solar event name, a 24-hour
/// `HH:MM:SS` clock time, or an RFC 3339 timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Marker {
    Solar(SolarEvent),
    Clock(NaiveTime),
    Absolute(DateTime<FixedOffset>),
}

impl Marker {
    #[must_use]
    pub fn is_solar(&self) -> bool {
        matches!(self, Self::Solar(_))
    }

    /// Resolve to a local instant.
    ///
    /// Clock times are placed on `date`. Solar markers need `solar`; without
    /// it, or when the clock time does not exist on `date`, the marker
    /// resolves to nothing.
    #[must_use]
    pub fn resolve(&self, solar: Option<&SolarTimes>, date: NaiveDate) -> Option<Timestamp> {
        match self {
            Self::Solar(event) => solar.map(|times| times.get(*event)),
            Self::Clock(clock) => time::at_local(date, *clock),
            Self::Absolute(instant) => Some(instant.with_timezone(&Local)),
        }
    }
}

impl FromStr for Marker {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(event) = s.parse::<SolarEvent>() {
            return Ok(Self::Solar(event));
        }
        if let Ok(clock) = NaiveTime::parse_from_str(s, CLOCK_FORMAT) {
            return Ok(Self::Clock(clock));
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::Absolute(instant));
        }
        Err(PolicyError::InvalidMarker {
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for Marker {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Marker> for String {
    fn from(marker: Marker) -> Self {
        marker.to_string()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solar(event) => f.write_str(event.as_str()),
            Self::Clock(clock) => write!(f, "{}", clock.format(CLOCK_FORMAT)),
            Self::Absolute(instant) => f.write_str(&instant.to_rfc3339()),
        }
    }
}
