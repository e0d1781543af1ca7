//! # Daemons (hc-08)
//!
//! Background loops of a node: dissemination, block generation, block
//! collection and mempool verification all run as [`Daemon`]s under one
//! [`Supervisor`].
//!
//! | Concern | Where |
//! |---------|-------|
//! | name to handler | [`DaemonRegistry`] |
//! | database wait, heartbeat, sleep, cancellation | `service::run_loop` |
//! | panics and restarts | `service::supervise`, [`RestartPolicy`] |
//! | stale daemons | [`Watchdog`] |
//!
//! Shutdown is a `tokio::sync::watch` flag shared by every loop; a daemon
//! may raise it itself through [`DaemonContext::request_shutdown`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::{RestartPolicy, SupervisorConfig};
pub use domain::{
    beat, DaemonContext, DaemonRegistry, Heartbeat, Watchdog, HEARTBEAT_CAPACITY, ROLLBACK_LIST,
};
pub use error::{DaemonError, Result};
pub use ports::{Daemon, DbProbe};
pub use service::{wait_db, DaemonExit, Supervisor};
