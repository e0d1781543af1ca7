//! Structured logging.
//!
//! Every log line carries the emitting target plus the structured fields of
//! the call site. With `json_logs` the output is one JSON object per line,
//! ready for a log shipper.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global `tracing` subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if !config.console_output {
        registry
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        registry
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true);
        registry
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        level = %config.log_level,
        "Logging initialized"
    );
    Ok(())
}

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(component = $component, $($($field)*,)? $msg)
    };
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(component = $component, $($($field)*,)? $msg)
    };
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(component = $component, $($($field)*,)? $msg)
    };
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(component = $component, $($($field)*,)? $msg)
    };
}

/// Log a block-related event with standard fields.
#[macro_export]
macro_rules! log_block_event {
    ($level:ident, $component:expr, $msg:expr, $block_id:expr, $block_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            block_id = $block_id,
            block_hash = %$block_hash,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a transaction-related event with standard fields.
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $component:expr, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}
