//! Configuration types for the daemon supervisor

use serde::Deserialize;
use std::time::Duration;

/// How often a panicking daemon is restarted before the node gives up.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    pub max_restarts: u32,
    pub backoff_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 3,
            backoff_ms: 1_000,
        }
    }
}

impl RestartPolicy {
    /// Linear backoff: the n-th restart waits n times the base delay.
    pub fn backoff(&self, restart: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(restart.max(1))))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub watchdog_period_ms: u64,
    /// A daemon silent for longer than this is reported stale.
    pub stale_after_ms: u64,
    pub db_wait_interval_ms: u64,
    pub restart: RestartPolicy,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            watchdog_period_ms: 60_000,
            stale_after_ms: 120_000,
            db_wait_interval_ms: 1_000,
            restart: RestartPolicy::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn watchdog_period(&self) -> Duration {
        Duration::from_millis(self.watchdog_period_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn db_wait_interval(&self) -> Duration {
        Duration::from_millis(self.db_wait_interval_ms)
    }
}
