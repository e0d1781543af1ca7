//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Chain**: `BlockHeader`, `InfoBlock`, `FirstBlockData`
//! - **Producers**: `HonorNode`
//! - **Side effects**: `Notification`

use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// The all-zero hash used before genesis.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Ecosystem 1 is the system ecosystem.
pub const SYSTEM_ECOSYSTEM: i64 = 1;

/// Block header as carried on the wire and stored in `block_chain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Monotonic block id, genesis is 1.
    pub block_id: i64,
    /// Seconds since the Unix epoch.
    pub time: i64,
    pub ecosystem_id: i64,
    /// Account id of the signer.
    pub key_id: i64,
    /// Index into the ordered active honor-node list.
    pub node_position: i64,
    pub version: i32,
    /// Double SHA-256 of the forsign string. Computed locally, never on the wire.
    pub hash: Hash,
    /// Chained digest of the rollback rows produced by this block.
    pub rollbacks_hash: Hash,
    /// Ed25519 signature over the forsign string.
    pub sign: Vec<u8>,
}

impl BlockHeader {
    /// Returns true for block id 1.
    pub fn is_genesis(&self) -> bool {
        self.block_id == 1
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Singleton mirror of the latest committed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InfoBlock {
    pub hash: Hash,
    pub rollbacks_hash: Hash,
    pub block_id: i64,
    pub time: i64,
    pub ecosystem_id: i64,
    pub key_id: i64,
    pub node_position: i64,
    pub current_version: String,
    /// Whether the dissemination daemon already pushed this block.
    pub sent: bool,
}

impl InfoBlock {
    /// Builds a fresh (unsent) info-block from a committed header.
    pub fn from_header(header: &BlockHeader) -> Self {
        Self {
            hash: header.hash,
            rollbacks_hash: header.rollbacks_hash,
            block_id: header.block_id,
            time: header.time,
            ecosystem_id: header.ecosystem_id,
            key_id: header.key_id,
            node_position: header.node_position,
            current_version: header.version.to_string(),
            sent: false,
        }
    }
}

/// Data extracted from the genesis transaction.
///
/// Kept by the parameter cache so that a chain with an empty `honor_nodes`
/// list still has one producer: the genesis signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FirstBlockData {
    pub time: i64,
    pub key_id: i64,
    #[serde(with = "hex")]
    pub public_key: Vec<u8>,
    #[serde(with = "hex")]
    pub node_public_key: Vec<u8>,
    pub test: bool,
    pub private_blockchain: bool,
}

// =============================================================================
// CLUSTER B: PRODUCERS
// =============================================================================

/// A node authorized to produce blocks.
///
/// Stored as JSON inside the `honor_nodes` system parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HonorNode {
    #[serde(default)]
    pub tcp_address: String,
    #[serde(default)]
    pub api_address: String,
    #[serde(with = "hex")]
    pub public_key: Vec<u8>,
    #[serde(default)]
    pub stopped: bool,
}

impl HonorNode {
    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }
}

// =============================================================================
// CLUSTER C: SIDE EFFECTS
// =============================================================================

/// Who a notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Account,
    Role,
}

/// A message queued by a contract during play and fired after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub ecosystem_id: i64,
    pub kind: NotificationKind,
    /// Account id for `Account`, role id for `Role`.
    pub recipient: i64,
    pub payload: String,
}
