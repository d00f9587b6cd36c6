//! Bulb: the last known state of a controllable light, as reported by a transport.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Transport-assigned identifier of a bulb (e.g. `0x0000000002dfb19a`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BulbId(String);

impl BulbId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BulbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Power state of a bulb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Power {
    On,
    #[default]
    Off,
}

impl Power {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// The state a toggle command leads to.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// Snapshot of a discovered bulb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bulb {
    pub id: BulbId,
    pub address: IpAddr,
    pub power: Power,
    pub brightness: i64,
}

impl Bulb {
    /// A bulb that is switched off at zero brightness.
    #[must_use]
    pub fn new(id: BulbId, address: IpAddr) -> Self {
        Self {
            id,
            address,
            power: Power::Off,
            brightness: 0,
        }
    }

    #[must_use]
    pub fn with_power(mut self, power: Power) -> Self {
        self.power = power;
        self
    }

    #[must_use]
    pub fn with_brightness(mut self, brightness: i64) -> Self {
        self.brightness = brightness;
        self
    }
}
