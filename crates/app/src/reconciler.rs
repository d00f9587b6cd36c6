//! Reconciler: turns brightness targets into bulb commands.

use std::cmp::Ordering;

use daylux_domain::bulb::Bulb;
use daylux_domain::error::TransportError;
use daylux_domain::policy::BrightnessTarget;

use crate::ports::BulbTransport;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Commands that reached a bulb.
    pub commands: usize,
    /// Target addresses with no discovered bulb.
    pub offline: usize,
    /// Bulbs skipped because a command failed.
    pub failed: usize,
}

impl ReconcileReport {
    /// Whether any bulb state was changed, so the transport snapshot is out of date.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.commands > 0
    }
}

/// Bring every targeted bulb to its target brightness.
///
/// Works against a single snapshot of the transport. A positive target
/// switches the bulb on if needed and then sets the brightness if it
/// differs; zero switches it off; negative targets are left alone. A failing
/// command is logged and only that bulb is skipped.
pub async fn reconcile<T: BulbTransport>(
    transport: &T,
    targets: &[BrightnessTarget],
) -> ReconcileReport {
    let snapshot = transport.snapshot();
    let mut report = ReconcileReport::default();

    for target in targets {
        for address in &target.bulbs {
            let Some(bulb) = snapshot.get(address) else {
                tracing::warn!(%address, "bulb offline");
                report.offline += 1;
                continue;
            };
            if let Err(err) = apply_target(transport, bulb, target.brightness, &mut report).await
            {
                tracing::warn!(%address, id = %bulb.id, %err, "bulb command failed");
                report.failed += 1;
            }
        }
    }

    report
}

async fn apply_target<T: BulbTransport>(
    transport: &T,
    bulb: &Bulb,
    brightness: i64,
    report: &mut ReconcileReport,
) -> Result<(), TransportError> {
    match brightness.cmp(&0) {
        Ordering::Greater => {
            if !bulb.power.is_on() {
                tracing::info!(address = %bulb.address, "switching bulb on");
                transport.toggle(&bulb.id).await?;
                report.commands += 1;
            }
            if bulb.brightness != brightness {
                tracing::info!(
                    address = %bulb.address,
                    from = bulb.brightness,
                    to = brightness,
                    "setting bulb brightness"
                );
                transport.set_brightness(&bulb.id, brightness).await?;
                report.commands += 1;
            }
        }
        Ordering::Equal => {
            if bulb.power.is_on() {
                tracing::info!(address = %bulb.address, "switching bulb off");
                transport.toggle(&bulb.id).await?;
                report.commands += 1;
            }
        }
        Ordering::Less => {
            tracing::debug!(address = %bulb.address, brightness, "negative target, leaving bulb alone");
        }
    }
    Ok(())
}
