// Shared transport configuration for building reqwest::Client instances.
//
// BridgeClient and Discovery share timeout and user-agent settings through
// this module. The bridge enforces a small concurrent-connection budget, so
// clients are built with a single idle connection per host.

use std::time::Duration;

use crate::error::Error;

pub(crate) const USER_AGENT: &str = concat!("nukli/", env!("CARGO_PKG_VERSION"));

/// Bounds accepted for the per-request timeout, in seconds.
pub const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=60;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        if !TIMEOUT_RANGE.contains(&timeout.as_secs()) || timeout.subsec_nanos() != 0 {
            return Err(Error::config(format!(
                "timeout must be a whole number of seconds between {} and {}",
                TIMEOUT_RANGE.start(),
                TIMEOUT_RANGE.end()
            )));
        }
        Ok(Self { timeout })
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))
    }
}
