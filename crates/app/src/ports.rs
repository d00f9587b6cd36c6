//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod bulb_transport;
pub mod geo_lookup;
pub mod reachability;
pub mod solar_lookup;

pub use bulb_transport::BulbTransport;
pub use geo_lookup::GeoLookup;
pub use reachability::ReachabilityProbe;
pub use solar_lookup::SolarLookup;
