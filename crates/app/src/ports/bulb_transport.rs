//! Bulb transport port: discovery of and commands to controllable bulbs.

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;

use daylux_domain::bulb::{Bulb, BulbId};
use daylux_domain::error::TransportError;

/// Access to the bulbs on the local network.
///
/// The transport owns the bulb records; the core only reads a
/// [`snapshot`](Self::snapshot) once per application tick and issues
/// commands by [`BulbId`].
pub trait BulbTransport: Send + Sync {
    /// Broadcast a discovery request. Answers are folded into the snapshot
    /// as they arrive.
    fn discover(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Passively listen for bulb announcements until the future is dropped.
    ///
    /// Returning (with or without an error) means the listener stopped and
    /// the caller may restart it.
    fn listen(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Last known state of every discovered bulb, keyed by address.
    fn snapshot(&self) -> HashMap<IpAddr, Bulb>;

    /// Flip the power state of a bulb.
    fn toggle(&self, id: &BulbId) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Set the brightness of a bulb, in percent.
    fn set_brightness(
        &self,
        id: &BulbId,
        brightness: i64,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
