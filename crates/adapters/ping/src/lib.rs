//! # daylux-adapter-ping
//!
//! [`ReachabilityProbe`] implementation that spawns `ping -c 1 -W <timeout>`
//! and treats a zero exit status as "device online".
//!
//! The child is killed when the probe future is dropped, so cancelled
//! presence checks do not leave processes behind.
//!
//! ## Dependency rule
//!
//! Depends on `daylux-app` (port traits) only.

pub mod config;

use std::net::IpAddr;
use std::process::Stdio;

use tokio::process::Command;

use daylux_app::ports::ReachabilityProbe;

pub use config::ProbeConfig;

/// Probes devices with one ICMP echo request each.
#[derive(Debug, Clone)]
pub struct PingProbe {
    program: String,
    timeout_secs: u64,
}

impl PingProbe {
    #[must_use]
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            program: config.program.clone(),
            timeout_secs: config.timeout_secs.max(1),
        }
    }

    fn command(&self, address: IpAddr) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(self.timeout_secs.to_string())
            .arg(address.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new(&ProbeConfig::default())
    }
}

impl ReachabilityProbe for PingProbe {
    async fn probe(&self, address: IpAddr) -> bool {
        match self.command(address).status().await {
            Ok(status) => {
                tracing::trace!(%address, %status, "ping finished");
                status.success()
            }
            Err(err) => {
                tracing::warn!(%address, %err, program = %self.program, "failed to run ping");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_with(program: &str) -> PingProbe {
        PingProbe::new(&ProbeConfig {
            program: program.to_string(),
            ..ProbeConfig::default()
        })
    }

    #[tokio::test]
    async fn should_report_reachable_on_zero_exit() {
        let probe = probe_with("true");
        assert!(probe.probe("192.168.2.51".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn should_report_unreachable_on_failure_exit() {
        let probe = probe_with("false");
        assert!(!probe.probe("192.168.2.51".parse().unwrap()).await);
    }

    #[tokio::test]
    async fn should_report_unreachable_when_program_is_missing() {
        let probe = probe_with("/nonexistent/daylux-ping");
        assert!(!probe.probe("192.168.2.51".parse().unwrap()).await);
    }

    #[test]
    fn should_pass_count_timeout_and_address() {
        let probe = PingProbe::default();
        let command = probe.command("10.0.0.7".parse().unwrap());
        let args: Vec<_> = command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, ["-c", "1", "-W", "1", "10.0.0.7"]);
        assert_eq!(command.as_std().get_program(), "ping");
    }
}
