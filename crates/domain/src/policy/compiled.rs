//! Compiled policy: a raw policy resolved against one day's solar times.

use std::collections::BTreeSet;
use std::net::IpAddr;

use chrono::NaiveDate;

use crate::policy::{RawPolicy, RuleSpec};
use crate::solar::SolarTimes;
use crate::time::{self, Timestamp};

/// Brightness at the bright end of a ramp when the rule does not say.
pub const DEFAULT_MIN_BRIGHTNESS: i64 = 0;
/// Brightness at the dark end of a ramp when the rule does not say.
pub const DEFAULT_MAX_BRIGHTNESS: i64 = 100;

/// How a matching rule produces a brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleBrightness {
    /// The same value across the whole window.
    Constant(i64),
    /// Linear interpolation from `min` at the bright time to `max` at the dark time.
    Ramp { min: i64, max: i64 },
}

/// A rule whose window is pinned to absolute local instants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub bright_time: Timestamp,
    pub dark_time: Timestamp,
    pub brightness: RuleBrightness,
}

impl CompiledRule {
    /// Earlier endpoint of the window, whichever marker it came from.
    #[must_use]
    pub fn window_start(&self) -> Timestamp {
        self.bright_time.min(self.dark_time)
    }

    /// Later endpoint of the window.
    #[must_use]
    pub fn window_end(&self) -> Timestamp {
        self.bright_time.max(self.dark_time)
    }

    /// Whether `at` falls inside the window, both ends included.
    #[must_use]
    pub fn contains(&self, at: Timestamp) -> bool {
        self.window_start() <= at && at <= self.window_end()
    }

    /// Brightness this rule asks for at `at`, or `None` outside the window.
    ///
    /// Ramps are rounded up to the next integer and are not clamped: a rule
    /// with out-of-range bounds yields out-of-range values.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn brightness_at(&self, at: Timestamp) -> Option<i64> {
        if !self.contains(at) {
            return None;
        }
        match self.brightness {
            RuleBrightness::Constant(value) => Some(value),
            RuleBrightness::Ramp { min, max } => {
                let span = time::seconds_between(self.dark_time, self.bright_time).abs();
                if span <= 0.0 {
                    return Some(min);
                }
                let elapsed = time::seconds_between(at, self.bright_time).abs();
                let value = min as f64 + elapsed / span * (max as f64 - min as f64);
                Some(value.ceil() as i64)
            }
        }
    }
}

/// The compiled rules for one group of bulbs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBulbPolicy {
    pub bulbs: BTreeSet<IpAddr>,
    /// `None` when the bulbs are not gated on device presence.
    pub gating_devices: Option<BTreeSet<IpAddr>>,
    pub rules: Vec<CompiledRule>,
}

/// A raw policy resolved for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPolicy {
    /// Local date the policy was compiled for.
    pub date: NaiveDate,
    pub bulbs: Vec<CompiledBulbPolicy>,
}

impl CompiledPolicy {
    /// Resolve every rule of `raw` against `reference`.
    ///
    /// - entries without bulb addresses are skipped;
    /// - solar markers take their instant from `solar`, clock markers are
    ///   placed on the reference date, absolute markers are kept;
    /// - rules with an unresolved marker are dropped;
    /// - rules whose window ended before `reference` are dropped;
    /// - a constant brightness discards any min/max bounds.
    ///
    /// Rule order is preserved. `solar` may be `None` when no rule uses a
    /// solar marker.
    #[must_use]
    pub fn compile(raw: &RawPolicy, solar: Option<&SolarTimes>, reference: Timestamp) -> Self {
        let bulbs = raw
            .bulbs
            .iter()
            .filter_map(|entry| {
                let bulbs = entry.bulbs.clone()?;
                let gating_devices = entry
                    .gating_devices
                    .clone()
                    .filter(|devices| !devices.is_empty());
                let rules = entry
                    .rules
                    .iter()
                    .filter_map(|rule| compile_rule(rule, solar, reference))
                    .collect();
                Some(CompiledBulbPolicy {
                    bulbs,
                    gating_devices,
                    rules,
                })
            })
            .collect();

        Self {
            date: reference.date_naive(),
            bulbs,
        }
    }

    /// Whether the policy was compiled for another day than `reference`'s.
    #[must_use]
    pub fn is_stale(&self, reference: Timestamp) -> bool {
        self.date != reference.date_naive()
    }

    /// Every device any bulb group is gated on.
    #[must_use]
    pub fn monitored_devices(&self) -> BTreeSet<IpAddr> {
        self.bulbs
            .iter()
            .filter_map(|bulb| bulb.gating_devices.as_ref())
            .flatten()
            .copied()
            .collect()
    }

    /// Total number of rules that survived compilation.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.bulbs.iter().map(|bulb| bulb.rules.len()).sum()
    }
}

fn compile_rule(
    rule: &RuleSpec,
    solar: Option<&SolarTimes>,
    reference: Timestamp,
) -> Option<CompiledRule> {
    let date = reference.date_naive();
    let bright_time = rule.bright_time?.resolve(solar, date)?;
    let dark_time = rule.dark_time?.resolve(solar, date)?;
    if bright_time.max(dark_time) < reference {
        return None;
    }

    let brightness = match rule.const_brightness {
        Some(value) => RuleBrightness::Constant(value),
        None => RuleBrightness::Ramp {
            min: rule.min_brightness.unwrap_or(DEFAULT_MIN_BRIGHTNESS),
            max: rule.max_brightness.unwrap_or(DEFAULT_MAX_BRIGHTNESS),
        },
    };

    Some(CompiledRule {
        bright_time,
        dark_time,
        brightness,
    })
}
