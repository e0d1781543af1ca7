//! Error types for dissemination and the peer protocol

use hc_02_state_store::DbError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DisseminationError>;

/// Failures talking to one peer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{host}: timed out")]
    Timeout { host: String },

    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("unknown message kind {0}")]
    UnknownKind(u8),

    #[error("expected {expected} reply, got {got}")]
    UnexpectedReply { expected: &'static str, got: &'static str },

    #[error("payload: {0}")]
    Payload(String),

    /// The peer has no such address configured.
    #[error("peer {0} unreachable")]
    Unreachable(String),
}

impl From<bincode::Error> for TransportError {
    fn from(err: bincode::Error) -> Self {
        Self::Payload(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum DisseminationError {
    /// Every peer refused the payload.
    #[error("sending to all {hosts} hosts failed, last error: {last}")]
    AllHostsFailed { hosts: usize, last: TransportError },

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("db: {0}")]
    Db(#[from] DbError),
}
