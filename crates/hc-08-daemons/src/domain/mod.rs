//! Domain layer: loop context, heartbeats, registry.

pub mod context;
pub mod heartbeat;
pub mod registry;

pub use context::DaemonContext;
pub use heartbeat::{beat, run_watchdog, Heartbeat, Watchdog, HEARTBEAT_CAPACITY};
pub use registry::{DaemonRegistry, ROLLBACK_LIST};
