use super::QUEUE_PARSER_TX;
use crate::context::NodeContext;
use async_trait::async_trait;
use hc_04_transaction_executor::Transaction;
use hc_08_daemons::{Daemon, DaemonContext, DaemonError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Transactions verified per iteration.
pub const VERIFY_BATCH: usize = 1_000;

/// Runs the standalone checks on new mempool entries so the generator may
/// pick them.
pub struct QueueParserTx {
    ctx: Arc<NodeContext>,
}

impl QueueParserTx {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    /// Returns `(verified, rejected)`.
    pub async fn parse_queue(&self) -> hc_02_state_store::Result<(usize, usize)> {
        let ctx = &self.ctx;
        let queue = ctx.db.read(|t| t.unverified_transactions(VERIFY_BATCH));
        if queue.is_empty() {
            return Ok((0, 0));
        }

        let now = ctx.now();
        let _guard = ctx.db_lock.lock().await;
        let mut dbtx = ctx.db.begin()?;
        let (mut verified, mut rejected) = (0, 0);
        for pending in &queue {
            if dbtx.log_transaction(&pending.hash).is_some() {
                dbtx.delete_pending_tx(&pending.hash);
                continue;
            }
            let checked = Transaction::parse_verified(&pending.data)
                .and_then(|tx| tx.check_time(now).map(|()| tx))
                .map_err(|e| e.to_string())
                .and_then(|tx| {
                    if ctx.tx_bans.is_banned(tx.key_id()) {
                        Err(format!("key {} is banned", tx.key_id()))
                    } else {
                        Ok(tx)
                    }
                });
            match checked {
                Ok(_) => {
                    dbtx.set_transaction_verified(&pending.hash, true);
                    verified += 1;
                }
                Err(reason) => {
                    debug!(tx_hash = %hex::encode(pending.hash), reason = %reason, "[node] queued transaction refused");
                    dbtx.mark_transaction_bad(&pending.hash, pending.key_id, &reason, now);
                    ctx.tx_bans.record_bad(pending.key_id);
                    rejected += 1;
                }
            }
        }
        dbtx.commit()?;
        Ok((verified, rejected))
    }
}

#[async_trait]
impl Daemon for QueueParserTx {
    fn name(&self) -> &'static str {
        QUEUE_PARSER_TX
    }

    fn sleep_time(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn run(&self, _ctx: &DaemonContext) -> Result<()> {
        let (verified, rejected) = self
            .parse_queue()
            .await
            .map_err(|e| DaemonError::handler(QUEUE_PARSER_TX, e))?;
        if verified + rejected > 0 {
            debug!(verified, rejected, "[node] mempool queue parsed");
        }
        Ok(())
    }
}
