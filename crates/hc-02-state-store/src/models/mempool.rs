//! `transactions` table, the mempool.

use crate::domain::rows::PendingTx;
use crate::domain::tables::Tables;
use crate::error::{DbError, Result};
use crate::service::DbTransaction;
use shared_types::Hash;
use std::sync::Arc;

/// High-rate first, then oldest first, then by hash for a total order.
fn priority(a: &&PendingTx, b: &&PendingTx) -> std::cmp::Ordering {
    b.high_rate
        .cmp(&a.high_rate)
        .then(a.time.cmp(&b.time))
        .then(a.hash.cmp(&b.hash))
}

impl Tables {
    pub fn pending_tx(&self, hash: &Hash) -> Option<&PendingTx> {
        self.transactions.get(hash)
    }

    pub fn pending_count(&self) -> usize {
        self.transactions.len()
    }

    fn select(&self, limit: usize, pred: impl Fn(&PendingTx) -> bool) -> Vec<PendingTx> {
        let mut picked: Vec<&PendingTx> = self.transactions.values().filter(|t| pred(t)).collect();
        picked.sort_by(priority);
        picked.into_iter().take(limit).cloned().collect()
    }

    /// Transactions not yet pushed to peers.
    pub fn unsent_transactions(&self, limit: usize) -> Vec<PendingTx> {
        self.select(limit, |t| !t.sent)
    }

    /// Candidates for block generation.
    pub fn verified_unused_transactions(&self, limit: usize) -> Vec<PendingTx> {
        self.select(limit, |t| t.verified && !t.used)
    }

    /// Transactions waiting for standalone verification.
    pub fn unverified_transactions(&self, limit: usize) -> Vec<PendingTx> {
        self.select(limit, |t| !t.verified)
    }
}

impl DbTransaction {
    pub fn insert_pending_tx(&mut self, tx: PendingTx) -> Result<()> {
        let pool = Arc::make_mut(&mut self.tables_mut().transactions);
        if pool.contains_key(&tx.hash) {
            return Err(DbError::Duplicate {
                table: "transactions".into(),
                key: hex::encode(tx.hash),
            });
        }
        pool.insert(tx.hash, tx);
        Ok(())
    }

    /// Put a transaction back as unverified and unused, replacing any copy.
    pub fn requeue_transaction(&mut self, mut tx: PendingTx) {
        tx.verified = false;
        tx.used = false;
        Arc::make_mut(&mut self.tables_mut().transactions).insert(tx.hash, tx);
    }

    /// Bulk-mark as sent; returns how many rows changed.
    pub fn mark_transactions_sent(&mut self, hashes: &[Hash]) -> usize {
        let pool = Arc::make_mut(&mut self.tables_mut().transactions);
        let mut changed = 0;
        for hash in hashes {
            if let Some(tx) = pool.get_mut(hash) {
                if !tx.sent {
                    tx.sent = true;
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn mark_transactions_used(&mut self, hashes: &[Hash]) {
        let pool = Arc::make_mut(&mut self.tables_mut().transactions);
        for hash in hashes {
            if let Some(tx) = pool.get_mut(hash) {
                tx.used = true;
            }
        }
    }

    pub fn set_transaction_verified(&mut self, hash: &Hash, verified: bool) -> bool {
        match Arc::make_mut(&mut self.tables_mut().transactions).get_mut(hash) {
            Some(tx) => {
                tx.verified = verified;
                true
            }
            None => false,
        }
    }

    /// Reset every verified-but-unused transaction to unverified.
    pub fn mark_verified_unused_unverified(&mut self) -> usize {
        let pool = Arc::make_mut(&mut self.tables_mut().transactions);
        let mut changed = 0;
        for tx in pool.values_mut().filter(|t| t.verified && !t.used) {
            tx.verified = false;
            changed += 1;
        }
        changed
    }

    pub fn delete_pending_tx(&mut self, hash: &Hash) -> bool {
        Arc::make_mut(&mut self.tables_mut().transactions)
            .remove(hash)
            .is_some()
    }
}
