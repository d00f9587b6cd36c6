//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod policy_compiler;
pub mod presence_tracker;
pub mod solar_resolver;

pub use policy_compiler::PolicyCompiler;
pub use presence_tracker::PresenceTracker;
pub use solar_resolver::SolarResolver;
