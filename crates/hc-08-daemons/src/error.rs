//! Error types for the daemon supervisor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DaemonError>;

#[derive(Debug, Error)]
pub enum DaemonError {
    /// A handler iteration failed; the loop carries on.
    #[error("{daemon}: {message}")]
    Handler { daemon: String, message: String },

    #[error("unknown daemon {0}")]
    Unknown(String),

    /// Restarts exhausted; the node is shutting down.
    #[error("daemon {name} escalated after {restarts} restarts")]
    Escalated { name: String, restarts: u32 },
}

impl DaemonError {
    pub fn handler(daemon: &str, err: impl std::fmt::Display) -> Self {
        Self::Handler {
            daemon: daemon.to_string(),
            message: err.to_string(),
        }
    }
}
