//! Controller facade: lifecycle of the lighting controller.
//!
//! The controller wires the policy compiler, the presence tracker and the
//! bulb transport together and owns the three control loops:
//!
//! 1. **discovery**: one discovery broadcast, then the passive listener;
//! 2. **detection**: starts presence probes for monitored devices;
//! 3. **application**: evaluates the policy and reconciles the bulbs.
//!
//! Loops are started and stopped as a group. Starting twice or stopping a
//! stopped controller is harmless.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use daylux_domain::error::DayluxError;
use daylux_domain::policy::{BrightnessTarget, CompiledPolicy, RawPolicy};
use daylux_domain::solar::Coordinates;
use daylux_domain::time::{self, Timestamp};

use crate::ports::{BulbTransport, GeoLookup, ReachabilityProbe, SolarLookup};
use crate::reconciler::{self, ReconcileReport};
use crate::scheduler::{self, LoopHandle};
use crate::services::presence_tracker::DEFAULT_RETRY_PAUSE;
use crate::services::{PolicyCompiler, PresenceTracker, SolarResolver};

/// Tunables of a [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Period of the application loop.
    pub apply_interval: Duration,
    /// Period of the detection loop.
    pub detection_interval: Duration,
    /// Probe attempts before a device is considered offline.
    pub offline_delay: u32,
    /// Pause between two probe attempts.
    pub probe_retry_pause: Duration,
    /// How long a loop may take to stop before it is aborted.
    pub shutdown_timeout: Duration,
    /// Pause before restarting a stopped bulb listener.
    pub discovery_retry: Duration,
    /// Pause between two failed geolocation attempts.
    pub geo_retry: Duration,
    /// Fixed location; geolocation is used when `None`.
    pub coordinates: Option<Coordinates>,
    /// Source of the current time.
    pub clock: fn() -> Timestamp,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            apply_interval: Duration::from_secs(10),
            detection_interval: Duration::from_secs(10),
            offline_delay: 10,
            probe_retry_pause: DEFAULT_RETRY_PAUSE,
            shutdown_timeout: Duration::from_secs(5),
            discovery_retry: Duration::from_secs(30),
            geo_retry: Duration::from_secs(5),
            coordinates: None,
            clock: time::now,
        }
    }
}

#[derive(Default)]
struct Loops {
    discovery: Option<LoopHandle>,
    detection: Option<LoopHandle>,
    application: Option<LoopHandle>,
}

struct Inner<T, S, G, P> {
    settings: ControllerSettings,
    transport: Arc<T>,
    tracker: Arc<PresenceTracker<P>>,
    compiler: PolicyCompiler<S, G, P>,
    loops: Mutex<Loops>,
    running: AtomicBool,
}

/// The lighting controller.
///
/// Cheap to clone; clones share the same state and loops.
pub struct Controller<T, S, G, P> {
    inner: Arc<Inner<T, S, G, P>>,
}

impl<T, S, G, P> Clone for Controller<T, S, G, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S, G, P> Controller<T, S, G, P>
where
    T: BulbTransport + 'static,
    S: SolarLookup + 'static,
    G: GeoLookup + 'static,
    P: ReachabilityProbe + 'static,
{
    /// Create a stopped controller with an empty policy.
    pub fn new(transport: T, solar: S, geo: G, probe: P, settings: ControllerSettings) -> Self {
        let tracker = Arc::new(PresenceTracker::new(
            probe,
            settings.offline_delay,
            settings.probe_retry_pause,
        ));
        let resolver = SolarResolver::new(solar, geo, settings.coordinates, settings.geo_retry);
        let compiler = PolicyCompiler::new(resolver, Arc::clone(&tracker));
        Self {
            inner: Arc::new(Inner {
                settings,
                transport: Arc::new(transport),
                tracker,
                compiler,
                loops: Mutex::new(Loops::default()),
                running: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.inner.settings
    }

    /// The bulb transport the controller drives.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Replace the policy and compile it for the current time.
    ///
    /// Presence tracking restarts from the new policy's gating devices.
    ///
    /// # Errors
    ///
    /// Returns [`DayluxError::Lookup`] when solar times cannot be resolved;
    /// the previous policy stays deployed.
    pub async fn deploy_policy(&self, raw: RawPolicy) -> Result<Arc<CompiledPolicy>, DayluxError> {
        let now = (self.inner.settings.clock)();
        Ok(self.inner.compiler.deploy(raw, now).await?)
    }

    /// Start the control loops. Loops that already run are left alone.
    pub async fn start(&self) {
        let mut loops = self.inner.loops.lock().await;
        let settings = &self.inner.settings;

        if loops.discovery.is_none() {
            let transport = Arc::clone(&self.inner.transport);
            let retry = settings.discovery_retry;
            loops.discovery = Some(LoopHandle::spawn("discovery", move |cancel| {
                scheduler::run_discovery(transport, retry, cancel)
            }));
        }

        if loops.detection.is_none() {
            let tracker = Arc::clone(&self.inner.tracker);
            let period = settings.detection_interval;
            loops.detection = Some(LoopHandle::spawn("detection", move |cancel| {
                scheduler::run_every(period, cancel, move || {
                    let started = tracker.spawn_missing_probes();
                    if started > 0 {
                        tracing::debug!(started, "presence probes started");
                    }
                    async {}
                })
            }));
        }

        if loops.application.is_none() {
            let controller = self.clone();
            let period = settings.apply_interval;
            loops.application = Some(LoopHandle::spawn("application", move |cancel| {
                scheduler::run_every(period, cancel, move || {
                    let controller = controller.clone();
                    async move {
                        if let Err(err) = controller.apply_once().await {
                            tracing::error!(%err, "failed to apply light policy");
                        }
                    }
                })
            }));
        }

        self.inner.running.store(true, Ordering::SeqCst);
        tracing::info!("controller started");
    }

    /// Stop the control loops: application first, then detection and its
    /// probes, then discovery. Each stop is bounded by the shutdown timeout.
    pub async fn stop(&self) {
        let mut loops = self.inner.loops.lock().await;
        let timeout = self.inner.settings.shutdown_timeout;

        if let Some(handle) = loops.application.take() {
            handle.stop(timeout).await;
        }
        if let Some(handle) = loops.detection.take() {
            handle.stop(timeout).await;
        }
        self.inner.tracker.shutdown(timeout).await;
        if let Some(handle) = loops.discovery.take() {
            handle.stop(timeout).await;
        }

        self.inner.running.store(false, Ordering::SeqCst);
        tracing::info!("controller stopped");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Brightness targets at `current`.
    ///
    /// With `override_policy`, that policy is compiled for `current` and
    /// evaluated without touching the deployed policy or presence tracking.
    /// Otherwise the deployed policy is used, recompiled first when it was
    /// compiled for another day.
    ///
    /// # Errors
    ///
    /// Returns [`DayluxError::Lookup`] when a needed compilation fails.
    pub async fn evaluate(
        &self,
        current: Timestamp,
        override_policy: Option<&RawPolicy>,
    ) -> Result<Vec<BrightnessTarget>, DayluxError> {
        let compiled = match override_policy {
            Some(raw) => Arc::new(self.inner.compiler.compile(raw, current).await?),
            None => self.inner.compiler.current(current).await?,
        };
        let online = self.inner.tracker.online();
        Ok(compiled.evaluate(current, |address| online.contains(address)))
    }

    /// Run one application tick now: evaluate, reconcile, and re-discover
    /// bulbs when any command was sent.
    ///
    /// # Errors
    ///
    /// Returns [`DayluxError::Lookup`] when the policy cannot be compiled.
    /// Bulb command failures are logged, not returned.
    pub async fn apply_once(&self) -> Result<ReconcileReport, DayluxError> {
        let now = (self.inner.settings.clock)();
        let targets = self.evaluate(now, None).await?;
        for target in &targets {
            tracing::debug!(
                bulbs = ?target.bulbs,
                brightness = target.brightness,
                rule = ?target.matched_rule,
                "brightness target"
            );
        }

        let transport = &*self.inner.transport;
        let report = reconciler::reconcile(transport, &targets).await;
        if report.changed()
            && let Err(err) = transport.discover().await
        {
            tracing::warn!(%err, "bulb re-discovery failed");
        }
        Ok(report)
    }

    /// The compiled policy currently in effect, if any.
    #[must_use]
    pub fn compiled(&self) -> Option<Arc<CompiledPolicy>> {
        self.inner.compiler.snapshot()
    }

    #[must_use]
    pub fn online_devices(&self) -> BTreeSet<IpAddr> {
        self.inner.tracker.online()
    }

    #[must_use]
    pub fn monitored_devices(&self) -> BTreeSet<IpAddr> {
        self.inner.tracker.monitored()
    }
}
