//! # daylux-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `BulbTransport`: discover bulbs, listen for announcements, send commands
//!   - `SolarLookup`: solar event times for a date and location
//!   - `GeoLookup`: the host's approximate location
//!   - `ReachabilityProbe`: is a device answering on the network
//! - Provide the use-cases:
//!   - `SolarResolver`: coordinates + solar lookup, converted to local time
//!   - `PolicyCompiler`: per-day compiled policy snapshot and recompilation
//!   - `PresenceTracker`: online/offline state of gating devices
//!   - `reconciler`: turn brightness targets into bulb commands
//!   - `scheduler`: cancellable periodic loops
//!   - `Controller`: start/stop/deploy facade over all of the above
//!
//! ## Dependency rule
//! Depends on `daylux-domain` only (plus `tokio` and `tokio-util` for tasks,
//! channels and cancellation). Never imports adapter crates. Adapters depend
//! on *this* crate, not the reverse.

pub mod controller;
pub mod ports;
pub mod reconciler;
pub mod scheduler;
pub mod services;

pub use controller::{Controller, ControllerSettings};
