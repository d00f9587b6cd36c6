//! Geolocation port.

use std::future::Future;

use daylux_domain::error::LookupError;
use daylux_domain::solar::Coordinates;

/// Resolves where the host is.
pub trait GeoLookup: Send + Sync {
    fn locate(&self) -> impl Future<Output = Result<Coordinates, LookupError>> + Send;
}
