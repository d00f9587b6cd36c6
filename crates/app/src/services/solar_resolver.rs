//! Solar resolver: local solar times for a date at the host's location.

use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::OnceCell;

use daylux_domain::error::LookupError;
use daylux_domain::solar::{Coordinates, SolarTimes};

use crate::ports::{GeoLookup, SolarLookup};

/// Resolves solar times, locating the host once per process.
///
/// Coordinates are either fixed at construction or obtained from the
/// [`GeoLookup`] on first use. Geolocation is retried until it succeeds; the
/// result is kept for the lifetime of the resolver. Solar times themselves
/// are not cached.
pub struct SolarResolver<S, G> {
    solar: S,
    geo: G,
    coordinates: OnceCell<Coordinates>,
    geo_retry: Duration,
}

impl<S, G> SolarResolver<S, G>
where
    S: SolarLookup,
    G: GeoLookup,
{
    /// Create a resolver.
    ///
    /// When `coordinates` is `None` the geolocation port is asked on first
    /// use and retried every `geo_retry` until it answers.
    pub fn new(solar: S, geo: G, coordinates: Option<Coordinates>, geo_retry: Duration) -> Self {
        Self {
            solar,
            geo,
            coordinates: OnceCell::new_with(coordinates),
            geo_retry,
        }
    }

    /// Coordinates used for lookups, locating the host if not known yet.
    pub async fn coordinates(&self) -> Coordinates {
        *self
            .coordinates
            .get_or_init(|| self.locate_until_found())
            .await
    }

    /// Solar times for `date`, converted to the local zone.
    ///
    /// # Errors
    ///
    /// Returns the [`LookupError`] of the solar lookup port.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, date: NaiveDate) -> Result<SolarTimes, LookupError> {
        let coordinates = self.coordinates().await;
        let times = self
            .solar
            .fetch(date, coordinates)
            .await
            .inspect_err(|err| tracing::error!(%err, %coordinates, "solar lookup failed"))?;
        tracing::debug!(?times, "solar times resolved");
        Ok(times.to_local())
    }

    async fn locate_until_found(&self) -> Coordinates {
        loop {
            match self.geo.locate().await {
                Ok(coordinates) => {
                    tracing::info!(%coordinates, "host located");
                    return coordinates;
                }
                Err(err) => {
                    tracing::warn!(%err, retry_in = ?self.geo_retry, "geolocation failed");
                    tokio::time::sleep(self.geo_retry).await;
                }
            }
        }
    }
}
