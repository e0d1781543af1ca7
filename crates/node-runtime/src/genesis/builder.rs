//! # First Block Builder
//!
//! Creates the signed block 1 that bootstraps a new network.

use hc_03_block_codec::{marshal, CodecError};
use hc_04_transaction_executor::{first_block, ExecError};
use hc_05_block_engine::BLOCK_VERSION;
use shared_crypto::{key_id_from_public, Ed25519KeyPair};
use shared_types::{BlockHeader, SYSTEM_ECOSYSTEM};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("first block file {0} already exists")]
    AlreadyExists(PathBuf),

    #[error("first block file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("first block transaction: {0}")]
    Transaction(#[from] ExecError),

    #[error("first block encoding: {0}")]
    Codec(#[from] CodecError),

    /// Neither a first block file nor a bootstrap host could provide block 1.
    #[error("first block unavailable: {0}")]
    Unavailable(String),
}

/// Founding parameters of a new network.
#[derive(Debug, Clone)]
pub struct GenesisConfig {
    /// Unix seconds.
    pub time: i64,
    pub founder_amount: i128,
    pub test: bool,
    pub private_blockchain: bool,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            time: 0,
            founder_amount: 100_000_000,
            test: false,
            private_blockchain: false,
        }
    }
}

/// Sign block 1 carrying a single first-block transaction by `key`, which is
/// also the producing node.
pub fn build_first_block(key: &Ed25519KeyPair, config: &GenesisConfig) -> Result<Vec<u8>, GenesisError> {
    let public_key = key.public_key().as_bytes().to_vec();
    let tx = first_block(
        key,
        public_key.clone(),
        config.time,
        config.founder_amount,
        config.test,
        config.private_blockchain,
    )?;
    let header = BlockHeader {
        block_id: 1,
        time: config.time,
        ecosystem_id: SYSTEM_ECOSYSTEM,
        key_id: key_id_from_public(&public_key),
        node_position: 0,
        version: BLOCK_VERSION,
        ..Default::default()
    };
    let (bytes, signed) = marshal(&header, &[tx.data], &BlockHeader::default(), key)?;
    info!(
        key_id = signed.key_id,
        time = signed.time,
        size = bytes.len(),
        "[node] first block built"
    );
    Ok(bytes)
}

/// Write `bytes` to `path`, refusing to replace an existing file.
pub fn write_first_block(path: &Path, bytes: &[u8]) -> Result<(), GenesisError> {
    if path.exists() {
        return Err(GenesisError::AlreadyExists(path.to_path_buf()));
    }
    let io = |source| GenesisError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, bytes).map_err(io)
}

pub fn read_first_block(path: &Path) -> Result<Option<Vec<u8>>, GenesisError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(GenesisError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
