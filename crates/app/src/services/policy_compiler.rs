//! Policy compiler: owns the raw policy and the compiled snapshot for today.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};

use daylux_domain::error::LookupError;
use daylux_domain::policy::{CompiledPolicy, RawPolicy};
use daylux_domain::time::Timestamp;

use crate::ports::{GeoLookup, ReachabilityProbe, SolarLookup};
use crate::services::{PresenceTracker, SolarResolver};

/// Latest compiled policy, `None` until the first compilation.
pub type PolicySnapshot = Option<Arc<CompiledPolicy>>;

/// Compiles the deployed policy once per calendar day and publishes it.
///
/// Readers get whole snapshots through a [`watch`] channel. Recompilation is
/// serialised: the raw policy lives behind the same lock, so concurrent
/// callers never compile twice for the same date. After each successful
/// recompilation the presence tracker is reset to the new monitored set.
///
/// A deployed policy that could not be compiled yet stays pending: the
/// published snapshot is kept for readers, but [`current`](Self::current)
/// retries the pending policy on every call until it compiles.
pub struct PolicyCompiler<S, G, P> {
    resolver: SolarResolver<S, G>,
    tracker: Arc<PresenceTracker<P>>,
    raw: Mutex<Arc<RawPolicy>>,
    pending: AtomicBool,
    snapshot: watch::Sender<PolicySnapshot>,
}

impl<S, G, P> PolicyCompiler<S, G, P>
where
    S: SolarLookup,
    G: GeoLookup,
    P: ReachabilityProbe + 'static,
{
    /// Create a compiler with an empty policy and no snapshot.
    pub fn new(resolver: SolarResolver<S, G>, tracker: Arc<PresenceTracker<P>>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            resolver,
            tracker,
            raw: Mutex::new(Arc::new(RawPolicy::default())),
            pending: AtomicBool::new(false),
            snapshot,
        }
    }

    /// The currently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> PolicySnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every publication.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PolicySnapshot> {
        self.snapshot.subscribe()
    }

    /// Replace the raw policy and compile it for `reference` right away.
    ///
    /// The new policy is adopted even when compilation fails. The previous
    /// snapshot then stays published and the new policy is compiled again
    /// by the next [`current`](Self::current) call.
    ///
    /// # Errors
    ///
    /// Returns the [`LookupError`] raised while resolving solar times.
    #[tracing::instrument(skip(self, raw), fields(entries = raw.bulbs.len()))]
    pub async fn deploy(
        &self,
        raw: RawPolicy,
        reference: Timestamp,
    ) -> Result<Arc<CompiledPolicy>, LookupError> {
        let mut current = self.raw.lock().await;
        *current = Arc::new(raw);
        self.pending.store(true, Ordering::SeqCst);
        self.compile_and_publish(&current, reference).await
    }

    /// The compiled policy valid for `reference`, recompiling first when
    /// nothing was compiled yet, a deployed policy is pending or the
    /// snapshot is from another day.
    ///
    /// # Errors
    ///
    /// Returns the [`LookupError`] of a failed recompilation. The previous
    /// snapshot stays published in that case.
    pub async fn current(&self, reference: Timestamp) -> Result<Arc<CompiledPolicy>, LookupError> {
        if let Some(compiled) = self.fresh_snapshot(reference) {
            return Ok(compiled);
        }

        let raw = self.raw.lock().await;
        // another caller may have recompiled while we waited
        if let Some(compiled) = self.fresh_snapshot(reference) {
            return Ok(compiled);
        }
        tracing::info!(date = %reference.date_naive(), "recompiling policy");
        self.compile_and_publish(&raw, reference).await
    }

    /// Compile `raw` for `reference` without touching the snapshot or the
    /// presence tracker.
    ///
    /// # Errors
    ///
    /// Returns the [`LookupError`] raised while resolving solar times.
    pub async fn compile(
        &self,
        raw: &RawPolicy,
        reference: Timestamp,
    ) -> Result<CompiledPolicy, LookupError> {
        let solar = if raw.references_solar() {
            Some(self.resolver.resolve(reference.date_naive()).await?)
        } else {
            None
        };
        Ok(CompiledPolicy::compile(raw, solar.as_ref(), reference))
    }

    fn fresh_snapshot(&self, reference: Timestamp) -> Option<Arc<CompiledPolicy>> {
        if self.pending.load(Ordering::SeqCst) {
            return None;
        }
        self.snapshot
            .borrow()
            .as_ref()
            .filter(|compiled| !compiled.is_stale(reference))
            .cloned()
    }

    async fn compile_and_publish(
        &self,
        raw: &RawPolicy,
        reference: Timestamp,
    ) -> Result<Arc<CompiledPolicy>, LookupError> {
        let compiled = Arc::new(self.compile(raw, reference).await?);
        tracing::info!(
            date = %compiled.date,
            bulbs = compiled.bulbs.len(),
            rules = compiled.rule_count(),
            "policy compiled"
        );
        tracing::debug!(?compiled, "compiled policy");

        self.snapshot.send_replace(Some(Arc::clone(&compiled)));
        self.tracker.reset(compiled.monitored_devices());
        self.pending.store(false, Ordering::SeqCst);
        Ok(compiled)
    }
}
