//! # daylux-domain
//!
//! Pure domain model for the daylux lighting controller.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, local timestamps
//! - Define **Solar times** (sunrise, sunset, civil twilight) and coordinates
//! - Define the **raw policy** document operators write (bulbs, gating devices, rules)
//! - Define **markers**: solar events, clock times, absolute timestamps
//! - Compile a raw policy into a per-day **compiled policy** of absolute windows
//! - Evaluate a compiled policy into per-bulb **brightness targets**
//! - Define the **bulb** record a transport reports
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod bulb;
pub mod policy;
pub mod solar;
