//! Error types for block rollback

use hc_01_system_parameters::ParamError;
use hc_02_state_store::DbError;
use hc_03_block_codec::CodecError;
use hc_04_transaction_executor::ExecError;
use hc_05_block_engine::BlockError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RollbackError>;

#[derive(Debug, Error)]
pub enum RollbackError {
    /// The genesis block cannot be rolled back.
    #[error("cannot roll back to block {0}")]
    InvalidTarget(i64),

    /// Only the current tip can be undone.
    #[error("block {block_id} is not the tip (tip is {tip})")]
    NotTip { block_id: i64, tip: i64 },

    #[error("block {0} not found")]
    BlockNotFound(i64),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    #[error("transaction: {0}")]
    Transaction(#[from] ExecError),

    #[error("block: {0}")]
    Block(#[from] BlockError),

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("parameters: {0}")]
    Param(#[from] ParamError),
}
