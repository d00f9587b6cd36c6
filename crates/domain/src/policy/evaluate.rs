//! Evaluation of a compiled policy at a point in time.

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::policy::{CompiledBulbPolicy, CompiledPolicy, CompiledRule};
use crate::time::Timestamp;

/// The brightness one bulb group should have right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrightnessTarget {
    pub bulbs: BTreeSet<IpAddr>,
    pub brightness: i64,
    /// The rule that produced the value, for logging.
    pub matched_rule: Option<CompiledRule>,
}

impl CompiledBulbPolicy {
    /// First rule whose window contains `now`.
    #[must_use]
    pub fn matching_rule(&self, now: Timestamp) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.contains(now))
    }

    /// Whether presence gating allows these bulbs to be lit.
    pub fn is_allowed(&self, is_online: impl Fn(&IpAddr) -> bool) -> bool {
        self.gating_devices
            .as_ref()
            .is_none_or(|devices| devices.iter().any(is_online))
    }

    /// Target brightness for this group, or `None` when no rule matches.
    ///
    /// When none of the gating devices is online the group is switched off
    /// without looking at the rules.
    pub fn evaluate(
        &self,
        now: Timestamp,
        is_online: impl Fn(&IpAddr) -> bool,
    ) -> Option<BrightnessTarget> {
        if !self.is_allowed(is_online) {
            return Some(BrightnessTarget {
                bulbs: self.bulbs.clone(),
                brightness: 0,
                matched_rule: None,
            });
        }
        let rule = self.matching_rule(now)?;
        let brightness = rule.brightness_at(now)?;
        Some(BrightnessTarget {
            bulbs: self.bulbs.clone(),
            brightness,
            matched_rule: Some(rule.clone()),
        })
    }
}

impl CompiledPolicy {
    /// Targets for every bulb group that is gated off or has a rule matching
    /// `now`.
    ///
    /// Ungated groups without a match are left out; the caller leaves those
    /// bulbs as they are.
    pub fn evaluate(
        &self,
        now: Timestamp,
        is_online: impl Fn(&IpAddr) -> bool,
    ) -> Vec<BrightnessTarget> {
        self.bulbs
            .iter()
            .filter_map(|bulb| bulb.evaluate(now, &is_online))
            .collect()
    }
}
