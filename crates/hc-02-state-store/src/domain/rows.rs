//! # Row Types
//!
//! One struct per system table. Generic ecosystem tables use [`Row`].

use serde::{Deserialize, Serialize};
use shared_types::Hash;
use std::collections::BTreeMap;

/// A row of a generic ecosystem table: column name to textual value.
pub type Row = BTreeMap<String, String>;

/// `block_chain` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockRow {
    pub id: i64,
    pub hash: Hash,
    pub rollbacks_hash: Hash,
    /// Verbatim wire bytes of the block.
    pub data: Vec<u8>,
    pub ecosystem_id: i64,
    pub key_id: i64,
    pub node_position: i64,
    pub time: i64,
    pub tx: i32,
}

/// `queue_blocks` row: a block announced by a peer, not fetched yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueBlock {
    pub hash: Hash,
    pub block_id: i64,
    pub honor_node_id: i64,
}

/// `transactions` row: the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: Hash,
    pub data: Vec<u8>,
    pub tx_type: u8,
    pub key_id: i64,
    pub time: i64,
    /// Passed the standalone checks and may be picked by the generator.
    pub verified: bool,
    /// Included in a block being generated or already committed.
    pub used: bool,
    /// Pushed to peers by the dissemination daemon.
    pub sent: bool,
    pub high_rate: bool,
}

impl PendingTx {
    /// A freshly submitted, unverified transaction.
    pub fn new(hash: Hash, data: Vec<u8>, tx_type: u8, key_id: i64, time: i64) -> Self {
        Self {
            hash,
            data,
            tx_type,
            key_id,
            time,
            verified: false,
            used: false,
            sent: false,
            high_rate: false,
        }
    }
}

/// `transactions_status` row, what clients poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxStatus {
    pub hash: Hash,
    pub time: i64,
    pub tx_type: u8,
    pub wallet_id: i64,
    pub block_id: i64,
    pub error: String,
    pub message: String,
}

/// `bad_transactions` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadTransaction {
    pub hash: Hash,
    pub key_id: i64,
    pub error: String,
    pub time: i64,
}

/// `rollback_tx` row: the pre-image of one row mutation.
///
/// `data == None` means the row did not exist before, so undoing deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub block_id: i64,
    pub tx_hash: Hash,
    /// Position of the mutation within its block.
    pub seq: u32,
    pub table_name: String,
    pub table_id: String,
    pub data: Option<Row>,
}

/// Column types known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Bytea,
    BigInt,
    Money,
    Json,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Bytea => "bytea",
            Self::BigInt => "bigint",
            Self::Money => "numeric",
            Self::Json => "jsonb",
        }
    }
}

/// `migration_history` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub version: String,
    pub applied_at: i64,
}
