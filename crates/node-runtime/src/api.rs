//! # Boundary API
//!
//! What the HTTP front end consumes. The front end itself runs outside this
//! process; these calls are its whole contract with the node.
//!
//! | Call | Effect |
//! |------|--------|
//! | [`NodeApi::submit`] | mempool + `transactions_status` |
//! | [`NodeApi::insert_block`] | synchronous commit, used for genesis |
//! | [`NodeApi::current_tip`] | committed tip header |
//! | [`NodeApi::counters_snapshot`] | chain and node counters |

use crate::context::NodeContext;
use crate::error::ApiError;
use hc_02_state_store::{DbError, PendingTx, TxStatus};
use hc_04_transaction_executor::Transaction;
use serde::Serialize;
use shared_types::{BlockHeader, Hash};
use std::sync::Arc;
use tracing::info;

/// Chain and node counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub blocks: usize,
    pub txs: usize,
    pub ecosystems: usize,
    pub keys: usize,
    pub honor_nodes: i64,
    /// Resident set size, when the platform reports it.
    pub memory_bytes: Option<u64>,
    /// Hosts of currently banned honor nodes.
    pub ban_list: Vec<String>,
}

#[derive(Clone)]
pub struct NodeApi {
    ctx: Arc<NodeContext>,
}

impl NodeApi {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    /// Append a transaction to the mempool and return its hash.
    pub async fn submit(&self, data: &[u8]) -> Result<Hash, ApiError> {
        let tx = Transaction::parse_verified(data)?;
        let now = self.ctx.now();
        tx.check_time(now)?;
        if self.ctx.tx_bans.is_banned(tx.key_id()) {
            return Err(ApiError::Banned(tx.key_id()));
        }

        let _guard = self.ctx.db_lock.lock().await;
        let known = self
            .ctx
            .db
            .read(|t| t.log_transaction(&tx.hash).is_some() || t.bad_transaction(&tx.hash).is_some());
        if known {
            return Err(ApiError::Duplicate(hex::encode(tx.hash)));
        }

        let mut dbtx = self.ctx.db.begin()?;
        let pending = PendingTx::new(tx.hash, tx.data.clone(), tx.tx_type(), tx.key_id(), tx.time());
        match dbtx.insert_pending_tx(pending) {
            Ok(()) => {}
            Err(DbError::Duplicate { .. }) => {
                dbtx.rollback();
                return Err(ApiError::Duplicate(hex::encode(tx.hash)));
            }
            Err(e) => {
                dbtx.rollback();
                return Err(e.into());
            }
        }
        dbtx.create_tx_status(TxStatus {
            hash: tx.hash,
            time: now,
            tx_type: tx.tx_type(),
            wallet_id: tx.key_id(),
            block_id: 0,
            error: String::new(),
            message: String::new(),
        });
        dbtx.commit()?;

        hc_telemetry::log_tx_event!(debug, "node", "[node] transaction accepted", hex::encode(tx.hash), key_id = tx.key_id());
        Ok(tx.hash)
    }

    /// Commit a block synchronously, without fork handling.
    pub async fn insert_block(&self, data: &[u8], first_block: bool) -> Result<BlockHeader, ApiError> {
        let _guard = self.ctx.db_lock.lock().await;
        let header = self.ctx.engine.insert_block_wo_forks(data, false, first_block)?;
        info!(block_id = header.block_id, "[node] block inserted");
        Ok(header)
    }

    /// `None` before genesis.
    pub fn current_tip(&self) -> Result<Option<BlockHeader>, ApiError> {
        Ok(self.ctx.engine.last_block()?)
    }

    pub fn counters_snapshot(&self) -> Counters {
        let (blocks, txs, ecosystems, keys) = self.ctx.db.read(|t| {
            (
                t.block_count(),
                t.log_transactions_count(),
                t.row_count("1_ecosystems"),
                t.row_count("1_keys"),
            )
        });
        Counters {
            blocks,
            txs,
            ecosystems,
            keys,
            honor_nodes: self.ctx.params.number_of_nodes(),
            memory_bytes: resident_memory(),
            ban_list: self.ctx.bans.ban_list(self.ctx.now()),
        }
    }
}

/// Resident pages from `/proc/self/statm`.
fn resident_memory() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4096)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{genesis_node, transfer, user, T0};
    use hc_04_transaction_executor::{smart_call, TxHeader};

    #[tokio::test]
    async fn test_submit_goes_to_mempool_and_status() {
        let api = NodeApi::new(Arc::new(genesis_node().await));
        let tx = transfer(T0 + 1, 10);
        let hash = api.submit(&tx.data).await.unwrap();
        assert_eq!(hash, tx.hash);

        let (pending, status) = api
            .ctx
            .db
            .read(|t| (t.pending_tx(&hash).cloned(), t.tx_status(&hash).cloned()));
        assert!(pending.is_some());
        assert_eq!(status.unwrap().block_id, 0);
    }

    #[tokio::test]
    async fn test_submit_rejects_duplicates() {
        let api = NodeApi::new(Arc::new(genesis_node().await));
        let tx = transfer(T0 + 1, 10);
        api.submit(&tx.data).await.unwrap();
        assert!(matches!(
            api.submit(&tx.data).await,
            Err(ApiError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_rejects_garbage_and_banned() {
        let api = NodeApi::new(Arc::new(genesis_node().await));
        let err = api.submit(b"\x80garbage").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.is_client_error());

        let key = user();
        let tx = smart_call(&key, TxHeader::for_key(&key, T0 + 1, 1, 1), "MoneyTransfer", &[]).unwrap();
        api.ctx.tx_bans.ban(tx.key_id());
        assert!(matches!(api.submit(&tx.data).await, Err(ApiError::Banned(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_stale_time() {
        let api = NodeApi::new(Arc::new(genesis_node().await));
        let tx = transfer(T0 - 200_000, 10);
        assert!(matches!(api.submit(&tx.data).await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_tip_and_counters() {
        let api = NodeApi::new(Arc::new(genesis_node().await));
        let tip = api.current_tip().unwrap().unwrap();
        assert_eq!(tip.block_id, 1);

        let counters = api.counters_snapshot();
        assert_eq!(counters.blocks, 1);
        assert_eq!(counters.txs, 1);
        assert_eq!(counters.ecosystems, 1);
        assert_eq!(counters.keys, 1);
        assert_eq!(counters.honor_nodes, 1);
        assert!(counters.ban_list.is_empty());
        let json = serde_json::to_value(&counters).unwrap();
        assert_eq!(json["blocks"], 1);
    }

    #[tokio::test]
    async fn test_current_tip_before_genesis() {
        let api = NodeApi::new(Arc::new(crate::testing::node()));
        assert!(api.current_tip().unwrap().is_none());
    }
}
