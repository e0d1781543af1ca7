//! Audit tables: `log_transactions`, `transactions_status`,
//! `bad_transactions` and `rollback_tx`.

use crate::domain::rows::{BadTransaction, RollbackRecord, TxStatus};
use crate::domain::tables::Tables;
use crate::service::DbTransaction;
use shared_types::Hash;
use std::sync::Arc;

impl Tables {
    /// Block id that logged this transaction hash.
    pub fn log_transaction(&self, hash: &Hash) -> Option<i64> {
        self.log_transactions.get(hash).copied()
    }

    pub fn log_transactions_count(&self) -> usize {
        self.log_transactions.len()
    }

    /// Hashes logged by one block.
    pub fn log_transactions_of_block(&self, block_id: i64) -> Vec<Hash> {
        self.log_transactions
            .iter()
            .filter(|(_, b)| **b == block_id)
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn tx_status(&self, hash: &Hash) -> Option<&TxStatus> {
        self.transactions_status.get(hash)
    }

    pub fn tx_status_count(&self) -> usize {
        self.transactions_status.len()
    }

    pub fn bad_transaction(&self, hash: &Hash) -> Option<&BadTransaction> {
        self.bad_transactions.get(hash)
    }

    pub fn bad_transactions_count(&self) -> usize {
        self.bad_transactions.len()
    }

    /// Rollback records of a block in play order.
    pub fn rollback_records(&self, block_id: i64) -> Vec<RollbackRecord> {
        self.rollback_tx
            .range((block_id, 0)..=(block_id, u32::MAX))
            .map(|(_, r)| r.clone())
            .collect()
    }
}

impl DbTransaction {
    pub fn create_log_transactions(&mut self, hashes: &[Hash], block_id: i64) {
        let log = Arc::make_mut(&mut self.tables_mut().log_transactions);
        for hash in hashes {
            log.insert(*hash, block_id);
        }
    }

    pub fn delete_log_transaction(&mut self, hash: &Hash) -> bool {
        Arc::make_mut(&mut self.tables_mut().log_transactions)
            .remove(hash)
            .is_some()
    }

    /// Insert the status row if missing.
    pub fn create_tx_status(&mut self, status: TxStatus) {
        Arc::make_mut(&mut self.tables_mut().transactions_status)
            .entry(status.hash)
            .or_insert(status);
    }

    /// Record where the transaction landed and its user-visible result.
    pub fn set_tx_status_block(&mut self, hash: &Hash, block_id: i64, message: &str) {
        let status = Arc::make_mut(&mut self.tables_mut().transactions_status)
            .entry(*hash)
            .or_insert_with(|| TxStatus {
                hash: *hash,
                ..Default::default()
            });
        status.block_id = block_id;
        status.message = message.to_string();
        status.error.clear();
    }

    pub fn set_tx_status_error(&mut self, hash: &Hash, error: &str) {
        let status = Arc::make_mut(&mut self.tables_mut().transactions_status)
            .entry(*hash)
            .or_insert_with(|| TxStatus {
                hash: *hash,
                ..Default::default()
            });
        status.error = error.to_string();
    }

    /// Record a transaction as bad: audit row, status error, and removal from
    /// the mempool.
    pub fn mark_transaction_bad(&mut self, hash: &Hash, key_id: i64, error: &str, time: i64) {
        Arc::make_mut(&mut self.tables_mut().bad_transactions).insert(
            *hash,
            BadTransaction {
                hash: *hash,
                key_id,
                error: error.to_string(),
                time,
            },
        );
        self.set_tx_status_error(hash, error);
        self.delete_pending_tx(hash);
    }

    pub fn insert_rollback_records(&mut self, records: Vec<RollbackRecord>) {
        let table = Arc::make_mut(&mut self.tables_mut().rollback_tx);
        for record in records {
            table.insert((record.block_id, record.seq), record);
        }
    }

    pub fn delete_rollback_records(&mut self, block_id: i64) -> usize {
        let table = Arc::make_mut(&mut self.tables_mut().rollback_tx);
        let before = table.len();
        table.retain(|(b, _), _| *b != block_id);
        before - table.len()
    }
}
