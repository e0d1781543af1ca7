//! Error types for the node runtime

use crate::genesis::GenesisError;
use hc_01_system_parameters::ParamError;
use hc_02_state_store::{DbError, LockError};
use hc_04_transaction_executor::ExecError;
use hc_05_block_engine::BlockError;
use hc_06_rollback::RollbackError;
use hc_07_dissemination::{DisseminationError, TransportError};
use shared_crypto::CryptoError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("invalid address for {name}: {value}")]
    InvalidAddress { name: &'static str, value: String },

    /// The Redis mirror is not part of this node.
    #[error("redis is not supported")]
    RedisUnsupported,

    #[error("unsupported database dsn: {0}")]
    UnsupportedDsn(String),
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file {0} not found")]
    NotFound(PathBuf),

    #[error("key file {0} already exists")]
    AlreadyExists(PathBuf),

    #[error("key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key: {0}")]
    Crypto(#[from] CryptoError),
}

/// Rejections at the submission boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid transaction: {0}")]
    Validation(#[from] ExecError),

    #[error("key {0} is banned")]
    Banned(i64),

    #[error("transaction {0} already known")]
    Duplicate(String),

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("block: {0}")]
    Block(#[from] BlockError),
}

impl ApiError {
    /// Caller fault, as opposed to a node fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Banned(_) | Self::Duplicate(_))
    }
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("keys: {0}")]
    Keys(#[from] KeyError),

    #[error("lock: {0}")]
    Lock(#[from] LockError),

    #[error("db: {0}")]
    Db(#[from] DbError),

    #[error("parameters: {0}")]
    Param(#[from] ParamError),

    #[error("transaction: {0}")]
    Exec(#[from] ExecError),

    #[error("block: {0}")]
    Block(#[from] BlockError),

    #[error("rollback: {0}")]
    Rollback(#[from] RollbackError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("dissemination: {0}")]
    Dissemination(#[from] DisseminationError),

    #[error("api: {0}")]
    Api(#[from] ApiError),

    #[error("genesis: {0}")]
    Genesis(#[from] GenesisError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
