//! Prometheus metrics for the Honor-Chain node.
//!
//! All metrics follow the naming convention: `hc_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., blocks_committed_total)
//! - **Gauge**: Value that can go up or down (e.g., chain_height)
//! - **Histogram**: Distribution of values (e.g., block_play_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::{Arc, OnceLock};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BLOCK ENGINE
    // =========================================================================

    /// Blocks committed (generated or received)
    pub static ref BLOCKS_COMMITTED: Counter = Counter::new(
        "hc_engine_blocks_committed_total",
        "Total number of blocks committed"
    ).expect("metric creation failed");

    /// Blocks rejected, by reject kind
    pub static ref BLOCKS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("hc_engine_blocks_rejected_total", "Total number of blocks rejected"),
        &["kind"]
    ).expect("metric creation failed");

    /// Wall-clock time of one PlaySafe
    pub static ref BLOCK_PLAY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "hc_engine_block_play_duration_seconds",
            "Time spent playing and committing a block"
        ).buckets(exponential_buckets(0.0005, 2.0, 15).unwrap())
    ).expect("metric creation failed");

    /// Current chain height
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "hc_chain_height",
        "Block id of info_block"
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSACTION EXECUTOR
    // =========================================================================

    /// Played transactions by outcome (ok/bad/skipped)
    pub static ref TRANSACTIONS_PLAYED: CounterVec = CounterVec::new(
        Opts::new("hc_executor_transactions_total", "Transactions played inside blocks"),
        &["outcome"]
    ).expect("metric creation failed");

    // =========================================================================
    // ROLLBACK / DISSEMINATION
    // =========================================================================

    /// Blocks removed by rollback
    pub static ref ROLLBACK_BLOCKS: Counter = Counter::new(
        "hc_rollback_blocks_total",
        "Total number of blocks rolled back"
    ).expect("metric creation failed");

    /// Items pushed to peers, by payload (block/tx)
    pub static ref DISSEMINATION_SENT: CounterVec = CounterVec::new(
        Opts::new("hc_dissemination_sent_total", "Items pushed to peers"),
        &["payload"]
    ).expect("metric creation failed");

    // =========================================================================
    // DAEMONS
    // =========================================================================

    /// One handler iteration per daemon
    pub static ref DAEMON_ITERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "hc_daemon_iteration_duration_seconds",
            "Time spent in one daemon handler iteration"
        ).buckets(exponential_buckets(0.001, 2.0, 15).unwrap()),
        &["daemon"]
    ).expect("metric creation failed");

    /// Panics caught in daemon loops
    pub static ref DAEMON_PANICS: CounterVec = CounterVec::new(
        Opts::new("hc_daemon_panics_total", "Panics caught in daemon loops"),
        &["daemon"]
    ).expect("metric creation failed");
}

/// Handle on the registered metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

static REGISTERED: OnceLock<Result<MetricsHandle, String>> = OnceLock::new();

/// Register all metrics with the global registry.
///
/// Safe to call more than once; registration happens on the first call.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    REGISTERED
        .get_or_init(register_all)
        .clone()
        .map_err(TelemetryError::MetricsInit)
}

fn register_all() -> Result<MetricsHandle, String> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Engine
        Box::new(BLOCKS_COMMITTED.clone()),
        Box::new(BLOCKS_REJECTED.clone()),
        Box::new(BLOCK_PLAY_DURATION.clone()),
        Box::new(CHAIN_HEIGHT.clone()),
        // Executor
        Box::new(TRANSACTIONS_PLAYED.clone()),
        // Rollback / dissemination
        Box::new(ROLLBACK_BLOCKS.clone()),
        Box::new(DISSEMINATION_SENT.clone()),
        // Daemons
        Box::new(DAEMON_ITERATION_DURATION.clone()),
        Box::new(DAEMON_PANICS.clone()),
    ];

    for metric in metrics {
        REGISTRY.register(metric).map_err(|e| e.to_string())?;
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
