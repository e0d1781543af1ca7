//! # Table Set
//!
//! The complete relational state. Every table sits behind an `Arc` so that a
//! clone of [`Tables`] is a handful of reference-count bumps; mutation goes
//! through `Arc::make_mut`, which duplicates a table only while a snapshot or
//! savepoint still shares it.

use crate::domain::rows::{
    BadTransaction, BlockRow, ColumnType, MigrationRecord, PendingTx, QueueBlock, RollbackRecord,
    Row, TxStatus,
};
use serde::{Deserialize, Serialize};
use shared_types::{Hash, InfoBlock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A generic ecosystem table such as `1_keys`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: BTreeMap<String, ColumnType>,
    pub rows: BTreeMap<String, Row>,
    /// Next id handed out by auto-increment inserts.
    pub next_id: i64,
}

/// All tables of the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    pub(crate) block_chain: Arc<BTreeMap<i64, BlockRow>>,
    pub(crate) info_block: Option<InfoBlock>,
    pub(crate) log_transactions: Arc<BTreeMap<Hash, i64>>,
    pub(crate) queue_blocks: Arc<BTreeMap<Hash, QueueBlock>>,
    pub(crate) transactions: Arc<BTreeMap<Hash, PendingTx>>,
    pub(crate) transactions_status: Arc<BTreeMap<Hash, TxStatus>>,
    pub(crate) bad_transactions: Arc<BTreeMap<Hash, BadTransaction>>,
    pub(crate) system_parameters: Arc<BTreeMap<String, String>>,
    /// Keyed by `(block_id, seq)`.
    pub(crate) rollback_tx: Arc<BTreeMap<(i64, u32), RollbackRecord>>,
    pub(crate) migration_history: Arc<Vec<MigrationRecord>>,
    pub(crate) data: Arc<BTreeMap<String, Arc<DataTable>>>,
}
