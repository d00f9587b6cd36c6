//! Solar lookup port: solar event times for a date and place.

use std::future::Future;

use chrono::NaiveDate;
use daylux_domain::error::LookupError;
use daylux_domain::solar::{Coordinates, UtcSolarTimes};

/// A service that knows when the sun rises and sets.
pub trait SolarLookup: Send + Sync {
    /// Solar event instants on `date` at `coordinates`, in UTC.
    fn fetch(
        &self,
        date: NaiveDate,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<UtcSolarTimes, LookupError>> + Send;
}
