//! Presence tracker: which monitored devices are currently online.
//!
//! Each monitored address gets at most one probe worker at a time. A worker
//! runs a single probe cycle (up to `offline_delay` attempts) and exits; the
//! detection loop calls [`PresenceTracker::spawn_missing_probes`] to start the
//! next cycle.

use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ports::ReachabilityProbe;

/// Pause between two attempts of the same probe cycle.
pub const DEFAULT_RETRY_PAUSE: Duration = Duration::from_millis(200);

struct ProbeWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct PresenceState {
    monitored: BTreeSet<IpAddr>,
    online: BTreeSet<IpAddr>,
    workers: HashMap<IpAddr, ProbeWorker>,
}

impl PresenceState {
    fn cancel_workers(&mut self) -> Vec<ProbeWorker> {
        let workers: Vec<ProbeWorker> = self.workers.drain().map(|(_, worker)| worker).collect();
        for worker in &workers {
            worker.cancel.cancel();
        }
        workers
    }
}

/// Tracks the online/offline state of a dynamic set of device addresses.
pub struct PresenceTracker<P> {
    probe: Arc<P>,
    attempts: u32,
    retry_pause: Duration,
    state: Arc<Mutex<PresenceState>>,
}

impl<P> PresenceTracker<P>
where
    P: ReachabilityProbe + 'static,
{
    /// Create a tracker that gives up on a device after `offline_delay`
    /// failed attempts, pausing `retry_pause` between attempts.
    pub fn new(probe: P, offline_delay: u32, retry_pause: Duration) -> Self {
        Self {
            probe: Arc::new(probe),
            attempts: offline_delay.max(1),
            retry_pause,
            state: Arc::new(Mutex::new(PresenceState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PresenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add addresses to the monitored set. Already monitored ones are ignored.
    pub fn register(&self, addresses: impl IntoIterator<Item = IpAddr>) {
        self.lock().monitored.extend(addresses);
    }

    /// Forget every monitored device, its presence and any running probe.
    pub fn unregister_all(&self) {
        let mut state = self.lock();
        state.monitored.clear();
        state.online.clear();
        state.cancel_workers();
    }

    /// Replace the monitored set in one step.
    ///
    /// Equivalent to [`unregister_all`](Self::unregister_all) followed by
    /// [`register`](Self::register), without a window where a probe could
    /// observe the intermediate state.
    pub fn reset(&self, addresses: impl IntoIterator<Item = IpAddr>) {
        let mut state = self.lock();
        state.monitored.clear();
        state.online.clear();
        state.cancel_workers();
        state.monitored.extend(addresses);
        tracing::debug!(monitored = state.monitored.len(), "presence tracking reset");
    }

    /// Reap finished probe workers and start one for every monitored
    /// address that has none. Returns the number of workers started.
    pub fn spawn_missing_probes(&self) -> usize {
        let mut state = self.lock();
        state.workers.retain(|_, worker| !worker.handle.is_finished());

        let missing: Vec<IpAddr> = state
            .monitored
            .iter()
            .filter(|address| !state.workers.contains_key(*address))
            .copied()
            .collect();

        for address in &missing {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(probe_cycle(
                Arc::clone(&self.probe),
                Arc::clone(&self.state),
                *address,
                self.attempts,
                self.retry_pause,
                cancel.clone(),
            ));
            state.workers.insert(*address, ProbeWorker { cancel, handle });
        }
        missing.len()
    }

    #[must_use]
    pub fn is_online(&self, address: &IpAddr) -> bool {
        self.lock().online.contains(address)
    }

    /// Snapshot of the addresses currently considered online.
    #[must_use]
    pub fn online(&self) -> BTreeSet<IpAddr> {
        self.lock().online.clone()
    }

    /// Snapshot of the monitored addresses.
    #[must_use]
    pub fn monitored(&self) -> BTreeSet<IpAddr> {
        self.lock().monitored.clone()
    }

    /// Cancel every probe worker and wait for them, up to `timeout` in total.
    ///
    /// Workers still running at the deadline are aborted. Monitored and
    /// online sets are left untouched.
    pub async fn shutdown(&self, timeout: Duration) {
        let workers = self.lock().cancel_workers();
        let deadline = tokio::time::Instant::now() + timeout;
        for mut worker in workers {
            if tokio::time::timeout_at(deadline, &mut worker.handle)
                .await
                .is_err()
            {
                tracing::warn!("probe worker did not stop in time, aborting");
                worker.handle.abort();
            }
        }
    }
}

async fn probe_cycle<P: ReachabilityProbe>(
    probe: Arc<P>,
    state: Arc<Mutex<PresenceState>>,
    address: IpAddr,
    attempts: u32,
    retry_pause: Duration,
    cancel: CancellationToken,
) {
    let mut reachable = false;
    for attempt in 1..=attempts {
        let answered = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            answered = probe.probe(address) => answered,
        };
        if answered {
            reachable = true;
            break;
        }

        let remaining = attempts - attempt;
        if remaining == 0 {
            break;
        }
        tracing::debug!(%address, remaining, "device did not answer, retrying");
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(retry_pause) => {}
        }
    }

    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    // a reset may have cancelled this cycle while it waited for the lock
    if cancel.is_cancelled() {
        return;
    }
    if reachable {
        if state.online.insert(address) {
            tracing::info!(%address, "device online");
        }
    } else if state.online.remove(&address) {
        tracing::info!(%address, "device offline");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers with a per-address script, repeating the last entry.
    #[derive(Default)]
    struct ScriptedProbe {
        scripts: Mutex<HashMap<IpAddr, Vec<bool>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn with(address: IpAddr, answers: &[bool]) -> Self {
            let probe = Self::default();
            probe
                .scripts
                .lock()
                .unwrap()
                .insert(address, answers.to_vec());
            probe
        }
    }

    impl ReachabilityProbe for ScriptedProbe {
        fn probe(&self, address: IpAddr) -> impl Future<Output = bool> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().unwrap();
            let answer = match scripts.get_mut(&address) {
                Some(script) if script.len() > 1 => script.remove(0),
                Some(script) => script.first().copied().unwrap_or(false),
                None => false,
            };
            async move { answer }
        }
    }

    /// Never answers.
    struct HangingProbe;

    impl ReachabilityProbe for HangingProbe {
        async fn probe(&self, _address: IpAddr) -> bool {
            std::future::pending().await
        }
    }

    fn ip(text: &str) -> IpAddr {
        text.parse().unwrap()
    }

    async fn wait_for_workers<P: ReachabilityProbe + 'static>(tracker: &PresenceTracker<P>) {
        let workers: Vec<ProbeWorker> = tracker.lock().workers.drain().map(|(_, w)| w).collect();
        for worker in workers {
            worker.handle.await.unwrap();
        }
    }

    #[test]
    fn should_register_idempotently() {
        let tracker = PresenceTracker::new(HangingProbe, 3, Duration::ZERO);
        tracker.register([ip("10.0.0.51"), ip("10.0.0.52")]);
        tracker.register([ip("10.0.0.51")]);
        assert_eq!(tracker.monitored().len(), 2);
    }

    #[tokio::test]
    async fn should_mark_device_online_on_first_success() {
        let address = ip("10.0.0.51");
        let tracker =
            PresenceTracker::new(ScriptedProbe::with(address, &[false, true]), 5, Duration::ZERO);
        tracker.register([address]);

        assert_eq!(tracker.spawn_missing_probes(), 1);
        wait_for_workers(&tracker).await;

        assert!(tracker.is_online(&address));
        assert_eq!(tracker.probe.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_mark_device_offline_after_all_attempts_fail() {
        let address = ip("10.0.0.51");
        let tracker = PresenceTracker::new(
            ScriptedProbe::with(address, &[true, false]),
            3,
            Duration::ZERO,
        );
        tracker.register([address]);

        tracker.spawn_missing_probes();
        wait_for_workers(&tracker).await;
        assert!(tracker.is_online(&address));

        tracker.spawn_missing_probes();
        wait_for_workers(&tracker).await;
        assert!(!tracker.is_online(&address));
        assert_eq!(tracker.probe.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn should_not_spawn_second_worker_for_same_address() {
        let tracker = PresenceTracker::new(HangingProbe, 3, Duration::ZERO);
        tracker.register([ip("10.0.0.51")]);
        assert_eq!(tracker.spawn_missing_probes(), 1);
        assert_eq!(tracker.spawn_missing_probes(), 0);
        tracker.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn should_respawn_after_worker_finished() {
        let address = ip("10.0.0.51");
        let tracker = PresenceTracker::new(ScriptedProbe::with(address, &[true]), 1, Duration::ZERO);
        tracker.register([address]);
        assert_eq!(tracker.spawn_missing_probes(), 1);

        while !tracker
            .lock()
            .workers
            .values()
            .all(|worker| worker.handle.is_finished())
        {
            tokio::task::yield_now().await;
        }
        assert_eq!(tracker.spawn_missing_probes(), 1);
        wait_for_workers(&tracker).await;
    }

    #[tokio::test]
    async fn should_clear_everything_on_unregister_all() {
        let address = ip("10.0.0.51");
        let tracker = PresenceTracker::new(ScriptedProbe::with(address, &[true]), 1, Duration::ZERO);
        tracker.register([address]);
        tracker.spawn_missing_probes();
        wait_for_workers(&tracker).await;
        assert!(tracker.is_online(&address));

        tracker.unregister_all();
        assert!(tracker.monitored().is_empty());
        assert!(tracker.online().is_empty());
    }

    #[tokio::test]
    async fn should_discard_result_of_cancelled_probe() {
        let address = ip("10.0.0.51");
        let tracker = PresenceTracker::new(HangingProbe, 3, Duration::ZERO);
        tracker.register([address]);
        tracker.spawn_missing_probes();

        let worker = tracker.lock().workers.remove(&address).unwrap();
        tracker.reset([address]);
        worker.cancel.cancel();
        worker.handle.await.unwrap();

        assert!(!tracker.is_online(&address));
        assert_eq!(tracker.monitored(), BTreeSet::from([address]));
    }

    #[tokio::test]
    async fn should_replace_monitored_set_on_reset() {
        let tracker = PresenceTracker::new(HangingProbe, 3, Duration::ZERO);
        tracker.register([ip("10.0.0.51")]);
        tracker.spawn_missing_probes();

        tracker.reset([ip("10.0.0.60"), ip("10.0.0.61")]);

        assert_eq!(
            tracker.monitored(),
            BTreeSet::from([ip("10.0.0.60"), ip("10.0.0.61")])
        );
        assert!(tracker.lock().workers.is_empty());
    }

    #[tokio::test]
    async fn should_stop_hanging_workers_on_shutdown() {
        let tracker = PresenceTracker::new(HangingProbe, 3, Duration::ZERO);
        tracker.register([ip("10.0.0.51"), ip("10.0.0.52")]);
        tracker.spawn_missing_probes();

        tokio::time::timeout(Duration::from_secs(2), tracker.shutdown(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(tracker.lock().workers.is_empty());
        assert_eq!(tracker.monitored().len(), 2);
    }
}
