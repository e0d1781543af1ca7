//! # Honor-Chain Telemetry
//!
//! Logging and metrics shared by every crate of the node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HC_SERVICE_NAME` | `honor-chain` | Service name in log lines |
//! | `HC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `HC_JSON_LOGS` | `false` | JSON formatted logs |
//! | `HC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `HC_METRICS_PORT` | `9100` | Prometheus metrics port |
//! | `HC_NETWORK` | `testnet` | Network name |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, BLOCKS_COMMITTED,
    BLOCKS_REJECTED, BLOCK_PLAY_DURATION, CHAIN_HEIGHT, DAEMON_ITERATION_DURATION, DAEMON_PANICS,
    DISSEMINATION_SENT, ROLLBACK_BLOCKS, TRANSACTIONS_PLAYED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Initialize metrics first (registration is idempotent)
    let metrics_handle = register_metrics()?;

    init_logging(config)?;

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
