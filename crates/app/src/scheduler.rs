//! Control loops: cancellable background tasks with bounded shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ports::BulbTransport;

/// A running loop: its cancellation token and its task.
pub struct LoopHandle {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl LoopHandle {
    /// Spawn `body` with a fresh cancellation token.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(body(cancel.clone()));
        tracing::debug!(name, "loop started");
        Self {
            name,
            cancel,
            handle,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait for it up to `timeout`, aborting it after.
    ///
    /// Returns `true` when the loop finished on its own.
    pub async fn stop(mut self, timeout: Duration) -> bool {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(())) => {
                tracing::debug!(name = self.name, "loop stopped");
                true
            }
            Ok(Err(err)) => {
                tracing::warn!(name = self.name, %err, "loop ended abnormally");
                true
            }
            Err(_) => {
                tracing::warn!(name = self.name, ?timeout, "loop did not stop in time, aborting");
                self.handle.abort();
                false
            }
        }
    }
}

/// Call `tick` every `period` until `cancel` fires. The first tick is immediate.
///
/// Cancellation is observed between ticks only: a tick in progress always
/// runs to completion. A tick that overruns the period delays the next one
/// rather than bunching missed ticks together.
pub async fn run_every<F, Fut>(period: Duration, cancel: CancellationToken, mut tick: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        tick().await;
    }
}

/// Broadcast one discovery request, then keep the passive listener running.
///
/// A listener that stops is restarted after `retry`.
pub async fn run_discovery<T: BulbTransport>(
    transport: Arc<T>,
    retry: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = transport.discover() => {
            if let Err(err) = result {
                tracing::warn!(%err, "bulb discovery broadcast failed");
            }
        }
    }

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = transport.listen() => result,
        };
        match result {
            Ok(()) => tracing::debug!(retry_in = ?retry, "bulb listener ended"),
            Err(err) => tracing::warn!(%err, retry_in = ?retry, "bulb listener failed"),
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(retry) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use daylux_domain::bulb::{Bulb, BulbId};
    use daylux_domain::error::TransportError;

    #[derive(Default)]
    struct ListenCounter {
        discovers: AtomicUsize,
        listens: AtomicUsize,
    }

    impl BulbTransport for ListenCounter {
        fn discover(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
            self.discovers.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        }

        fn listen(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
            let call = self.listens.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Err(TransportError::Command("socket closed".into()))
                } else {
                    std::future::pending().await
                }
            }
        }

        fn snapshot(&self) -> HashMap<IpAddr, Bulb> {
            HashMap::new()
        }

        async fn toggle(&self, _id: &BulbId) -> Result<(), TransportError> {
            Ok(())
        }

        async fn set_brightness(&self, _id: &BulbId, _brightness: i64) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn should_tick_until_cancelled() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let handle = LoopHandle::spawn("ticker", move |cancel| {
            run_every(Duration::from_millis(5), cancel, move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {}
            })
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(handle.stop(Duration::from_secs(1)).await);

        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several ticks, got {seen}");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn should_abort_loop_that_ignores_cancellation() {
        let handle = LoopHandle::spawn("stubborn", |_cancel| std::future::pending::<()>());
        let stopped = handle.stop(Duration::from_millis(20)).await;
        assert!(!stopped);
    }

    #[tokio::test]
    async fn should_finish_tick_in_progress_before_stopping() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (ticks_started, ticks_finished) = (Arc::clone(&started), Arc::clone(&finished));
        let handle = LoopHandle::spawn("slow", move |cancel| {
            run_every(Duration::from_secs(60), cancel, move || {
                ticks_started.fetch_add(1, Ordering::SeqCst);
                let ticks_finished = Arc::clone(&ticks_finished);
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    ticks_finished.fetch_add(1, Ordering::SeqCst);
                }
            })
        });
        while started.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(handle.stop(Duration::from_secs(1)).await);

        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_abort_tick_that_outlives_shutdown_timeout() {
        let handle = LoopHandle::spawn("stuck", |cancel| {
            run_every(Duration::from_millis(1), cancel, || {
                tokio::time::sleep(Duration::from_secs(60))
            })
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.stop(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn should_restart_failed_listener() {
        let transport = Arc::new(ListenCounter::default());
        let running = Arc::clone(&transport);
        let handle = LoopHandle::spawn("discovery", move |cancel| {
            run_discovery(running, Duration::from_millis(1), cancel)
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.stop(Duration::from_secs(1)).await);

        assert_eq!(transport.discovers.load(Ordering::SeqCst), 1);
        assert_eq!(transport.listens.load(Ordering::SeqCst), 2);
    }
}
