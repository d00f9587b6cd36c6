//! Raw policy: the declarative document an operator writes.
//!
//! The JSON shape keeps the historical field names:
//!
//! ```json
//! [
//!   {
//!     "bulb_ip": ["192.168.2.31"],
//!     "light_on_only_when_device_online": ["192.168.2.51"],
//!     "policies": [
//!       { "bright_time": "00:00:00", "dark_time": "02:00:00", "min_brightness": 1, "max_brightness": 80 },
//!       { "bright_time": "sunrise", "dark_time": "civil_twilight_begin", "const_brightness": 0 }
//!     ]
//!   }
//! ]
//! ```

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PolicyError;
use crate::policy::Marker;

/// Ordered list of per-bulb policies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPolicy {
    pub bulbs: Vec<BulbPolicy>,
}

impl RawPolicy {
    #[must_use]
    pub fn new(bulbs: Vec<BulbPolicy>) -> Self {
        Self { bulbs }
    }

    /// Parse a policy from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the document is not an array of bulb
    /// policies or when a marker or brightness value cannot be interpreted.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether any rule refers to a solar event, i.e. compiling needs solar times.
    #[must_use]
    pub fn references_solar(&self) -> bool {
        self.bulbs
            .iter()
            .flat_map(|bulb| &bulb.rules)
            .any(RuleSpec::references_solar)
    }
}

/// The policy for one group of bulbs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulbPolicy {
    /// Bulbs driven by this entry; entries without it are skipped.
    #[serde(rename = "bulb_ip", default, skip_serializing_if = "Option::is_none")]
    pub bulbs: Option<BTreeSet<IpAddr>>,

    /// Devices of which at least one must be online for the bulbs to light up.
    #[serde(
        rename = "light_on_only_when_device_online",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gating_devices: Option<BTreeSet<IpAddr>>,

    /// Rules in priority order.
    #[serde(rename = "policies", default)]
    pub rules: Vec<RuleSpec>,
}

/// A single time-window rule, before markers are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bright_time: Option<Marker>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark_time: Option<Marker>,

    #[serde(
        default,
        deserialize_with = "lenient_brightness",
        skip_serializing_if = "Option::is_none"
    )]
    pub const_brightness: Option<i64>,

    #[serde(
        default,
        deserialize_with = "lenient_brightness",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_brightness: Option<i64>,

    #[serde(
        default,
        deserialize_with = "lenient_brightness",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_brightness: Option<i64>,
}

impl RuleSpec {
    #[must_use]
    pub fn references_solar(&self) -> bool {
        [self.bright_time, self.dark_time]
            .iter()
            .flatten()
            .any(Marker::is_solar)
    }
}

/// Accept integers, floats (truncated) and numeric strings for brightness values.
fn lenient_brightness<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Int(i64),
        Float(f64),
        Text(String),
    }

    #[allow(clippy::cast_possible_truncation)]
    fn truncate(value: f64) -> Option<i64> {
        value.is_finite().then(|| value.trunc() as i64)
    }

    let Some(value) = Option::<Lenient>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = match &value {
        Lenient::Int(v) => Some(*v),
        Lenient::Float(v) => truncate(*v),
        Lenient::Text(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(truncate))
        }
    };
    parsed.map(Some).ok_or_else(|| {
        let value = match value {
            Lenient::Int(v) => v.to_string(),
            Lenient::Float(v) => v.to_string(),
            Lenient::Text(text) => text,
        };
        D::Error::custom(PolicyError::InvalidBrightness { value })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solar::SolarEvent;

    const SAMPLE: &str = r#"[
        {
            "bulb_ip": ["192.168.2.31"],
            "light_on_only_when_device_online": ["192.168.2.51", "192.168.2.53"],
            "policies": [
                { "bright_time": "00:00:00", "dark_time": "02:00:00", "max_brightness": 80, "min_brightness": 1 },
                { "bright_time": "sunrise", "dark_time": "civil_twilight_begin", "const_brightness": 0 }
            ]
        }
    ]"#;

    #[test]
    fn should_parse_sample_document() {
        let policy = RawPolicy::from_json(SAMPLE).unwrap();
        assert_eq!(policy.bulbs.len(), 1);

        let bulb = &policy.bulbs[0];
        assert_eq!(bulb.bulbs.as_ref().unwrap().len(), 1);
        assert_eq!(bulb.gating_devices.as_ref().unwrap().len(), 2);
        assert_eq!(bulb.rules.len(), 2);
        assert_eq!(bulb.rules[0].min_brightness, Some(1));
        assert_eq!(bulb.rules[0].max_brightness, Some(80));
        assert_eq!(
            bulb.rules[1].bright_time,
            Some(Marker::Solar(SolarEvent::Sunrise))
        );
        assert_eq!(bulb.rules[1].const_brightness, Some(0));
    }

    #[test]
    fn should_accept_entry_without_bulbs() {
        let policy = RawPolicy::from_json(r#"[{ "policies": [] }]"#).unwrap();
        assert!(policy.bulbs[0].bulbs.is_none());
    }

    #[test]
    fn should_accept_rule_missing_a_marker() {
        let policy =
            RawPolicy::from_json(r#"[{ "bulb_ip": ["10.0.0.2"], "policies": [{ "bright_time": "sunset" }] }]"#)
                .unwrap();
        assert!(policy.bulbs[0].rules[0].dark_time.is_none());
    }

    #[test]
    fn should_reject_unknown_marker() {
        let result = RawPolicy::from_json(
            r#"[{ "bulb_ip": ["10.0.0.2"], "policies": [{ "bright_time": "noon", "dark_time": "sunset" }] }]"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unrecognised time marker"));
    }

    #[test]
    fn should_coerce_float_and_string_brightness() {
        let policy = RawPolicy::from_json(
            r#"[{ "bulb_ip": ["10.0.0.2"], "policies": [
                { "bright_time": "sunset", "dark_time": "23:00:00", "const_brightness": 42.9 },
                { "bright_time": "sunset", "dark_time": "23:00:00", "const_brightness": "17" }
            ] }]"#,
        )
        .unwrap();
        assert_eq!(policy.bulbs[0].rules[0].const_brightness, Some(42));
        assert_eq!(policy.bulbs[0].rules[1].const_brightness, Some(17));
    }

    #[test]
    fn should_reject_non_numeric_brightness() {
        let result = RawPolicy::from_json(
            r#"[{ "bulb_ip": ["10.0.0.2"], "policies": [
                { "bright_time": "sunset", "dark_time": "23:00:00", "const_brightness": "dim" }
            ] }]"#,
        );
        assert!(result.unwrap_err().to_string().contains("is not a number"));
    }

    #[test]
    fn should_detect_solar_references() {
        let policy = RawPolicy::from_json(SAMPLE).unwrap();
        assert!(policy.references_solar());

        let clock_only = RawPolicy::from_json(
            r#"[{ "bulb_ip": ["10.0.0.2"], "policies": [{ "bright_time": "18:00:00", "dark_time": "23:00:00" }] }]"#,
        )
        .unwrap();
        assert!(!clock_only.references_solar());
    }

    #[test]
    fn should_serialize_with_document_field_names() {
        let policy = RawPolicy::from_json(SAMPLE).unwrap();
        let value = serde_json::to_value(&policy).unwrap();
        assert!(value[0].get("bulb_ip").is_some());
        assert!(value[0].get("light_on_only_when_device_online").is_some());
        assert_eq!(value[0]["policies"][1]["bright_time"], "sunrise");
    }
}
