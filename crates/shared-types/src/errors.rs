//! # Error Types
//!
//! Classification shared by the block engine, the event bus and the peer layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a block ended in the `Rejected` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectKind {
    BadSignature,
    BadTime,
    BadRollbackHash,
    /// Duplicate hash or per-sender cap violation.
    Duplicate,
    LimitExceeded,
    Empty,
    /// A transaction of a received block failed to play.
    BadTransaction,
    /// Malformed framing: zero size, oversize, undecodable.
    Malformed,
    Io,
    Panic,
}

impl RejectKind {
    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadSignature => "bad_signature",
            Self::BadTime => "bad_time",
            Self::BadRollbackHash => "bad_rollback_hash",
            Self::Duplicate => "duplicate",
            Self::LimitExceeded => "limit_exceeded",
            Self::Empty => "empty",
            Self::BadTransaction => "bad_transaction",
            Self::Malformed => "malformed",
            Self::Io => "io",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup failures surfaced to the API boundary (HTTP 404 there).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("system parameter not found: {0}")]
    ParamNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_kind_labels_are_unique() {
        let kinds = [
            RejectKind::BadSignature,
            RejectKind::BadTime,
            RejectKind::BadRollbackHash,
            RejectKind::Duplicate,
            RejectKind::LimitExceeded,
            RejectKind::Empty,
            RejectKind::BadTransaction,
            RejectKind::Malformed,
            RejectKind::Io,
            RejectKind::Panic,
        ];
        let labels: std::collections::HashSet<_> = kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels.len(), kinds.len());
    }

    #[test]
    fn test_lookup_error_display() {
        let err = LookupError::ParamNotFound("max_tx_size".into());
        assert_eq!(err.to_string(), "system parameter not found: max_tx_size");
    }
}
