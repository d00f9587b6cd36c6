//! Reachability port: is a device answering on the network.

use std::future::Future;
use std::net::IpAddr;

/// A single reachability check against one address.
///
/// Failures to run the check count as unreachable; the adapter logs them.
pub trait ReachabilityProbe: Send + Sync {
    fn probe(&self, address: IpAddr) -> impl Future<Output = bool> + Send;
}
