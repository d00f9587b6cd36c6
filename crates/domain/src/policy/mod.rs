//! Lighting policy: the raw document, its compiled form for one day, and
//! evaluation of the compiled form at a point in time.
//!
//! A [`RawPolicy`] is what an operator writes. [`CompiledPolicy::compile`]
//! pins every rule to absolute local instants for a reference date, and
//! [`CompiledPolicy::evaluate`] turns the result into
//! [`BrightnessTarget`]s.

mod compiled;
mod evaluate;
mod marker;
mod raw;

pub use compiled::{
    CompiledBulbPolicy, CompiledPolicy, CompiledRule, DEFAULT_MAX_BRIGHTNESS,
    DEFAULT_MIN_BRIGHTNESS, RuleBrightness,
};
pub use evaluate::BrightnessTarget;
pub use marker::Marker;
pub use raw::{BulbPolicy, RawPolicy, RuleSpec};
