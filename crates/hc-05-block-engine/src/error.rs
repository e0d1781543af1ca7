//! # Error Types
//!
//! [`LimitError`] is what the limits meter reports; [`BlockError`] is every
//! way a block can end in `Rejected`. The bannable subset is what the peer
//! layer feeds into the ban service.

use hc_01_system_parameters::ParamError;
use hc_02_state_store::DbError;
use hc_03_block_codec::CodecError;
use hc_04_transaction_executor::{ExecError, VmError};
use shared_crypto::CryptoError;
use shared_types::RejectKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlockError>;

/// Limits meter verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    /// Block is full: commit what was played so far.
    #[error("block limit reached: {0}")]
    Stop(String),

    /// This transaction never fits a block: drop it as bad and continue.
    #[error("transaction skipped: {0}")]
    Skip(String),

    /// Leave this transaction for a later block and continue.
    #[error("transaction deferred: {0}")]
    Defer(String),

    /// Block generation ran out of wall-clock time.
    #[error("block generation time exceeded")]
    Time,

    /// Any limit violated outside generation.
    #[error("limit exceeded: {0}")]
    Exceeded(String),
}

/// Block pipeline errors.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("block size is zero")]
    ZeroBlockSize,

    #[error("block size {size} exceeds maximum {max}")]
    MaxBlockSize { size: usize, max: usize },

    #[error("unmarshall block: {0}")]
    UnmarshallBlock(String),

    /// Previous block missing, or the id gap is not exactly one.
    #[error("previous block {0} not found")]
    PrevBlockMissing(i64),

    /// A block with this id is already committed.
    #[error("block {0} already exists")]
    AlreadyExists(i64),

    #[error("block time {time} is in the future (now {now})")]
    FutureTime { time: i64, now: i64 },

    /// The slot is not this position's or already holds a block.
    #[error("incorrect block time {time} for position {position}")]
    IncorrectBlockTime { time: i64, position: i64 },

    #[error("incorrect block signature: {0}")]
    IncorrectSign(CryptoError),

    /// Signature failed and the carried previous rollbacks hash differs from ours.
    #[error("rollbacks hash of the previous block does not match")]
    IncorrectRollbackHash,

    #[error("no honor node for block: {0}")]
    UnknownNode(ParamError),

    #[error("duplicate transaction {0}")]
    DuplicateTransaction(String),

    #[error("key {key_id} has {count} transactions in block, max {max}")]
    UserLimit { key_id: i64, count: usize, max: usize },

    #[error("transaction {hash}: {source}")]
    Transaction {
        hash: String,
        #[source]
        source: ExecError,
    },

    #[error(transparent)]
    Limit(#[from] LimitError),

    /// Generation dropped every candidate.
    #[error("empty block")]
    EmptyBlock,

    #[error("network is stopping")]
    NetworkStopping,

    /// This node holds no position and cannot sign blocks.
    #[error("this node is not an honor node")]
    NotHonorNode,

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("parameters: {0}")]
    Param(#[from] ParamError),
}

impl From<CodecError> for BlockError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::ZeroBlockSize => Self::ZeroBlockSize,
            CodecError::MaxBlockSize { size, max } => Self::MaxBlockSize { size, max },
            other => Self::UnmarshallBlock(other.to_string()),
        }
    }
}

impl BlockError {
    /// Wrap an executor error, keeping the stop-network signal distinct.
    pub fn from_exec(hash: &[u8], err: ExecError) -> Self {
        match err {
            ExecError::NetworkStopping => Self::NetworkStopping,
            source => Self::Transaction {
                hash: hex::encode(hash),
                source,
            },
        }
    }

    /// The producer of a block failing this way may be banned.
    pub fn is_bannable(&self) -> bool {
        match self {
            Self::ZeroBlockSize
            | Self::MaxBlockSize { .. }
            | Self::UnmarshallBlock(_)
            | Self::IncorrectBlockTime { .. }
            | Self::FutureTime { .. }
            | Self::IncorrectSign(_)
            | Self::IncorrectRollbackHash
            | Self::DuplicateTransaction(_)
            | Self::UserLimit { .. } => true,
            Self::Transaction { source, .. } => source.is_tx_fault(),
            _ => false,
        }
    }

    pub fn reject_kind(&self) -> RejectKind {
        match self {
            Self::ZeroBlockSize | Self::MaxBlockSize { .. } | Self::UnmarshallBlock(_) => {
                RejectKind::Malformed
            }
            Self::FutureTime { .. } | Self::IncorrectBlockTime { .. } => RejectKind::BadTime,
            Self::IncorrectSign(_) | Self::UnknownNode(_) => RejectKind::BadSignature,
            Self::IncorrectRollbackHash => RejectKind::BadRollbackHash,
            Self::DuplicateTransaction(_) | Self::UserLimit { .. } | Self::AlreadyExists(_) => {
                RejectKind::Duplicate
            }
            Self::Limit(_) => RejectKind::LimitExceeded,
            Self::EmptyBlock => RejectKind::Empty,
            Self::Transaction { source, .. } => match source {
                ExecError::Panic(_) => RejectKind::Panic,
                ExecError::Db(_) => RejectKind::Io,
                ExecError::Vm(VmError::TimeLimit { .. }) => RejectKind::LimitExceeded,
                _ => RejectKind::BadTransaction,
            },
            Self::PrevBlockMissing(_)
            | Self::NetworkStopping
            | Self::NotHonorNode
            | Self::Db(_)
            | Self::Param(_) => RejectKind::Io,
        }
    }

    /// Fork hint: our chain and the producer's disagree below this block.
    pub fn is_fork_hint(&self) -> bool {
        matches!(self, Self::IncorrectRollbackHash | Self::PrevBlockMissing(_))
    }

    pub fn is_time_limit(&self) -> bool {
        match self {
            Self::Limit(LimitError::Time) => true,
            Self::Transaction { source, .. } => source.is_time_limit(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_errors_map_to_block_errors() {
        assert!(matches!(BlockError::from(CodecError::ZeroBlockSize), BlockError::ZeroBlockSize));
        assert!(matches!(
            BlockError::from(CodecError::TrailingBytes(3)),
            BlockError::UnmarshallBlock(_)
        ));
        assert!(BlockError::from(CodecError::UnknownVersion(9)).is_bannable());
    }

    #[test]
    fn test_db_failures_are_not_bannable() {
        let err = BlockError::from_exec(&[1; 32], ExecError::Db(DbError::TableNotFound("x".into())));
        assert!(!err.is_bannable());
        assert_eq!(err.reject_kind(), RejectKind::Io);

        let err = BlockError::from_exec(&[1; 32], ExecError::NotFounder);
        assert!(err.is_bannable());
        assert_eq!(err.reject_kind(), RejectKind::BadTransaction);
    }

    #[test]
    fn test_network_stopping_is_unwrapped() {
        let err = BlockError::from_exec(&[1; 32], ExecError::NetworkStopping);
        assert!(matches!(err, BlockError::NetworkStopping));
    }
}
