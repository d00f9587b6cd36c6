//! Process signals the daemon reacts to.

use tokio::signal;

/// What the daemon was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Ctrl+C, SIGTERM or SIGUSR1.
    Shutdown,
    /// SIGHUP: reload the policy file.
    Reload,
}

/// Listens for shutdown and reload signals.
pub struct Signals {
    #[cfg(unix)]
    terminate: Option<signal::unix::Signal>,
    #[cfg(unix)]
    user_stop: Option<signal::unix::Signal>,
    #[cfg(unix)]
    hangup: Option<signal::unix::Signal>,
}

impl Signals {
    /// Install the handlers. A handler that cannot be installed is logged and
    /// never fires.
    pub fn install() -> Self {
        Self {
            #[cfg(unix)]
            terminate: unix_signal(signal::unix::SignalKind::terminate(), "SIGTERM"),
            #[cfg(unix)]
            user_stop: unix_signal(signal::unix::SignalKind::user_defined1(), "SIGUSR1"),
            #[cfg(unix)]
            hangup: unix_signal(signal::unix::SignalKind::hangup(), "SIGHUP"),
        }
    }

    /// Wait for the next request.
    pub async fn next(&mut self) -> Request {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let (terminate, user_stop, hangup) = (
            recv(self.terminate.as_mut()),
            recv(self.user_stop.as_mut()),
            recv(self.hangup.as_mut()),
        );

        #[cfg(not(unix))]
        let (terminate, user_stop, hangup) = (
            std::future::pending::<()>(),
            std::future::pending::<()>(),
            std::future::pending::<()>(),
        );

        tokio::select! {
            () = ctrl_c => {
                tracing::info!("received Ctrl+C");
                Request::Shutdown
            }
            () = terminate => {
                tracing::info!("received SIGTERM");
                Request::Shutdown
            }
            () = user_stop => {
                tracing::info!("received SIGUSR1");
                Request::Shutdown
            }
            () = hangup => {
                tracing::info!("received SIGHUP");
                Request::Reload
            }
        }
    }
}

#[cfg(unix)]
fn unix_signal(kind: signal::unix::SignalKind, name: &str) -> Option<signal::unix::Signal> {
    match signal::unix::signal(kind) {
        Ok(signal) => Some(signal),
        Err(e) => {
            tracing::error!(error = %e, signal = name, "failed to install signal handler");
            None
        }
    }
}

#[cfg(unix)]
async fn recv(signal: Option<&mut signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            if signal.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn raise(name: &str) {
        let status = std::process::Command::new("kill")
            .args([format!("-{name}"), std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    async fn next_request(signals: &mut Signals) -> Request {
        tokio::time::timeout(Duration::from_secs(5), signals.next())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn should_map_signals_to_requests() {
        let mut signals = Signals::install();
        assert!(
            tokio::time::timeout(Duration::from_millis(20), signals.next())
                .await
                .is_err()
        );

        raise("HUP");
        assert_eq!(next_request(&mut signals).await, Request::Reload);

        raise("USR1");
        assert_eq!(next_request(&mut signals).await, Request::Shutdown);
    }
}
