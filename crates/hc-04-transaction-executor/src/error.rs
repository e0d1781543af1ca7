//! # Error Types
//!
//! [`VmError`] covers failures inside the contract runtime; [`ExecError`] is
//! what [`Executor::play`](crate::Executor::play) reports. Errors bubble out
//! untouched; the block engine classifies them.

use hc_01_system_parameters::ParamError;
use hc_02_state_store::DbError;
use shared_crypto::CryptoError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

// =============================================================================
// VM ERRORS
// =============================================================================

/// Errors raised by the contract runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// The block generation deadline passed before the contract finished.
    #[error("time limit exceeded: {elapsed_ms}ms > {max_ms}ms")]
    TimeLimit { elapsed_ms: u64, max_ms: u64 },

    #[error("unknown contract {0}")]
    UnknownContract(String),

    #[error("contract {0} already exists")]
    ContractExists(String),

    #[error("contract {0} is not editable")]
    NotEditable(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("insufficient funds: key {key_id} has {available}, needs {needed}")]
    InsufficientFunds {
        key_id: i64,
        needed: i128,
        available: i128,
    },

    #[error("account {0} not found")]
    AccountNotFound(i64),
}

// =============================================================================
// EXECUTION ERRORS
// =============================================================================

/// Errors of parsing, verifying or playing one transaction.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("empty transaction")]
    Empty,

    #[error("unknown transaction type {0}")]
    UnknownType(u8),

    #[error("malformed transaction body: {0}")]
    Malformed(String),

    #[error("transaction signature: {0}")]
    Signature(#[from] CryptoError),

    #[error("key id {claimed} does not match public key (expected {derived})")]
    KeyMismatch { claimed: i64, derived: i64 },

    #[error("transaction time {tx_time} outside [{min}, {max}]")]
    Time { tx_time: i64, min: i64, max: i64 },

    #[error("fuel exhausted: used {used}, budget {budget}")]
    FuelExhausted { used: i64, budget: i64 },

    #[error("key {key_id} may not call {contract}")]
    AccessDenied { contract: String, key_id: i64 },

    #[error("column {table}.{column} expects hex data")]
    InvalidByteColumn { table: String, column: String },

    #[error("only the founder may do this")]
    NotFounder,

    /// Orderly shutdown requested by a stop-network transaction.
    #[error("network is stopping")]
    NetworkStopping,

    #[error("vm: {0}")]
    Vm(#[from] VmError),

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("parameters: {0}")]
    Param(#[from] ParamError),

    #[error("panic while playing transaction: {0}")]
    Panic(String),
}

impl ExecError {
    /// The VM ran past the block generation deadline.
    pub fn is_time_limit(&self) -> bool {
        matches!(self, Self::Vm(VmError::TimeLimit { .. }))
    }

    pub fn is_network_stopping(&self) -> bool {
        matches!(self, Self::NetworkStopping)
    }

    pub fn is_db_error(&self) -> bool {
        matches!(self, Self::Db(_))
    }

    /// Failures of the transaction itself, as opposed to the node.
    pub fn is_tx_fault(&self) -> bool {
        !matches!(self, Self::Db(_) | Self::Panic(_) | Self::NetworkStopping)
    }
}
