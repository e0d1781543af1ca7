//! Error types for the parameter cache.

use shared_types::LookupError;
use thiserror::Error;

/// Result alias for parameter operations.
pub type Result<T> = std::result::Result<T, ParamError>;

/// Errors raised while loading or querying system parameters.
#[derive(Debug, Error)]
pub enum ParamError {
    /// Two entries of `honor_nodes` carry the same public key.
    #[error("duplicate honor node public key {0}")]
    DuplicateHonorNode(String),

    /// A JSON-valued parameter could not be parsed.
    #[error("invalid JSON in parameter {name}: {source}")]
    InvalidJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key belongs to an honor node marked as stopped.
    #[error("node is disabled")]
    NodeDisabled,

    #[error("incorrect public key")]
    IncorrectPublicKey,

    #[error("incorrect position {0}")]
    IncorrectPosition(i64),

    #[error("incorrect host {0}")]
    IncorrectHost(String),

    #[error("failed to get data of the first block")]
    FirstBlockData,

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ParamError {
    /// True when a retry after the next refresh may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::IncorrectPosition(_) | Self::IncorrectHost(_) | Self::FirstBlockData
        )
    }
}
