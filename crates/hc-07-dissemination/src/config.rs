//! Configuration types for the peer transport

use serde::Deserialize;
use std::time::Duration;

/// Largest frame accepted from a peer: a block plus a full transaction batch.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_ms: u64,
    /// Per read or write.
    pub io_timeout_ms: u64,
    pub max_frame_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3_000,
            io_timeout_ms: 10_000,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}
