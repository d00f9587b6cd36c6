//! # daylux-adapter-virtual
//!
//! Virtual bulb transport that simulates a small network of bulbs for
//! testing and demonstration purposes.
//!
//! The simulation keeps two views, like a real LAN protocol would:
//!
//! | View | Updated by | Read by |
//! |------|------------|---------|
//! | network | commands, [`VirtualBulbs::announce`], [`VirtualBulbs::unplug`] | [`VirtualBulbs::bulb`] |
//! | discovered snapshot | `discover`, `listen` | `snapshot` |
//!
//! Commands change the network immediately but the snapshot only catches up
//! on the next discovery, which is why the controller re-discovers after
//! sending commands.
//!
//! ## Dependency rule
//!
//! Depends on `daylux-app` (port traits) and `daylux-domain` only.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use daylux_app::ports::BulbTransport;
use daylux_domain::bulb::{Bulb, BulbId};
use daylux_domain::error::TransportError;

#[derive(Default)]
struct Network {
    bulbs: HashMap<BulbId, Bulb>,
    discovered: HashMap<IpAddr, Bulb>,
}

impl Network {
    fn sync(&mut self) {
        self.discovered = self
            .bulbs
            .values()
            .map(|bulb| (bulb.address, bulb.clone()))
            .collect();
    }
}

/// Simulated bulbs reachable through the [`BulbTransport`] port.
#[derive(Default)]
pub struct VirtualBulbs {
    network: Mutex<Network>,
    announcements: Notify,
}

impl VirtualBulbs {
    /// A network with one switched-off bulb per address.
    #[must_use]
    pub fn new(addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        let bulbs = addresses
            .into_iter()
            .map(|address| {
                let bulb = Bulb::new(virtual_id(address), address);
                (bulb.id.clone(), bulb)
            })
            .collect();
        Self {
            network: Mutex::new(Network {
                bulbs,
                discovered: HashMap::new(),
            }),
            announcements: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Network> {
        self.network.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plug a bulb into the network and let it announce itself to listeners.
    pub fn announce(&self, bulb: Bulb) {
        self.lock().bulbs.insert(bulb.id.clone(), bulb);
        self.announcements.notify_one();
    }

    /// Take the bulb at `address` off the network.
    pub fn unplug(&self, address: IpAddr) -> Option<Bulb> {
        let mut network = self.lock();
        let id = network
            .bulbs
            .values()
            .find(|bulb| bulb.address == address)
            .map(|bulb| bulb.id.clone())?;
        network.bulbs.remove(&id)
    }

    /// Actual state of the bulb at `address`, regardless of discovery.
    #[must_use]
    pub fn bulb(&self, address: IpAddr) -> Option<Bulb> {
        self.lock()
            .bulbs
            .values()
            .find(|bulb| bulb.address == address)
            .cloned()
    }

    fn command(&self, id: &BulbId, apply: impl FnOnce(&mut Bulb)) -> Result<(), TransportError> {
        let mut network = self.lock();
        let bulb = network
            .bulbs
            .get_mut(id)
            .ok_or_else(|| TransportError::UnknownBulb { id: id.clone() })?;
        apply(bulb);
        tracing::debug!(%id, power = %bulb.power, brightness = bulb.brightness, "virtual bulb updated");
        Ok(())
    }
}

impl BulbTransport for VirtualBulbs {
    async fn discover(&self) -> Result<(), TransportError> {
        let mut network = self.lock();
        network.sync();
        tracing::debug!(bulbs = network.discovered.len(), "virtual discovery");
        Ok(())
    }

    async fn listen(&self) -> Result<(), TransportError> {
        loop {
            self.announcements.notified().await;
            self.lock().sync();
        }
    }

    fn snapshot(&self) -> HashMap<IpAddr, Bulb> {
        self.lock().discovered.clone()
    }

    async fn toggle(&self, id: &BulbId) -> Result<(), TransportError> {
        self.command(id, |bulb| bulb.power = bulb.power.toggled())
    }

    async fn set_brightness(&self, id: &BulbId, brightness: i64) -> Result<(), TransportError> {
        self.command(id, |bulb| bulb.brightness = brightness)
    }
}

/// Stable identifier derived from the address, shaped like a bulb's hex id.
fn virtual_id(address: IpAddr) -> BulbId {
    let raw = match address {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    };
    BulbId::new(format!("0x{raw:016x}"))
}
