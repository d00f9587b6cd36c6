//! Probe configuration.

use serde::Deserialize;

/// How devices are probed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Seconds to wait for an echo reply.
    pub timeout_secs: u64,
    /// The ping executable, looked up on `PATH` unless absolute.
    pub program: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 1,
            program: "ping".to_string(),
        }
    }
}
