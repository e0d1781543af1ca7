//! Catching up with the network.
//!
//! ```text
//!   peers ──max_block_id──> highest peer above our tip?
//!     no  ─> done
//!     yes ─> fetch bodies from tip+1, insert one by one
//!              fork hint ─> roll back to the floor, refetch (once per pass)
//!              bad block ─> ban the producer, stop
//! ```

use super::BLOCKS_COLLECTION;
use crate::context::NodeContext;
use crate::error::{NodeError, Result as NodeResult};
use async_trait::async_trait;
use futures::future::join_all;
use hc_03_block_codec::unmarshal;
use hc_05_block_engine::BlockError;
use hc_08_daemons::{Daemon, DaemonContext, DaemonError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Block bodies requested per round trip.
pub const COLLECTION_BATCH: u32 = 100;

/// What one collection pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Collected {
    pub inserted: usize,
    pub rolled_back: usize,
    /// The pass stopped at a block it refused.
    pub rejected: Option<i64>,
}

pub struct BlocksCollection {
    ctx: Arc<NodeContext>,
}

impl BlocksCollection {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    /// Highest reachable, unbanned peer and its tip.
    async fn best_host(&self) -> Option<(String, i64)> {
        let ctx = &self.ctx;
        let (hosts, _) = ctx
            .bans
            .filter_hosts(ctx.params.default_remote_hosts(), ctx.now());
        let answers = join_all(hosts.iter().map(|host| ctx.transport.max_block_id(host))).await;
        hosts
            .into_iter()
            .zip(answers)
            .filter_map(|(host, answer)| match answer {
                Ok(id) => Some((host, id)),
                Err(e) => {
                    debug!(host = %host, error = %e, "[node] peer tip unavailable");
                    None
                }
            })
            .max_by_key(|(_, id)| *id)
    }

    pub async fn collect(&self, dctx: &DaemonContext) -> NodeResult<Collected> {
        let ctx = &self.ctx;
        let mut done = Collected::default();
        self.forget_stale_queue()?;

        let Some((host, max_id)) = self.best_host().await else {
            return Ok(done);
        };
        if max_id <= ctx.tip_id() {
            return Ok(done);
        }
        info!(host = %host, max_id, tip = ctx.tip_id(), "[node] 📥 collecting blocks");

        let _guard = ctx.db_lock.lock().await;
        let mut rolled_back = false;
        'fetch: while ctx.tip_id() < max_id && !dctx.is_shutting_down() {
            let from = ctx.tip_id() + 1;
            let bodies = ctx
                .transport
                .get_blocks_bodies(&host, from, COLLECTION_BATCH)
                .await?;
            if bodies.is_empty() {
                break;
            }
            for data in &bodies {
                match ctx.engine.insert_block_wo_forks(data, false, false) {
                    Ok(_) => done.inserted += 1,
                    Err(err) if err.is_fork_hint() && !rolled_back => {
                        let tip = ctx.tip_id();
                        let floor = ctx.rollback.rollback_floor(tip);
                        warn!(tip, floor, error = %err, "[node] fork detected, rolling back");
                        done.rolled_back += ctx.rollback.to_block_id(floor)?;
                        rolled_back = true;
                        continue 'fetch;
                    }
                    Err(err) => {
                        let (block_id, position) = unmarshal(data)
                            .map(|p| (p.header.block_id, p.header.node_position))
                            .unwrap_or((from, -1));
                        if matches!(err, BlockError::NetworkStopping) {
                            return Err(err.into());
                        }
                        ctx.report_bad_block(position, block_id, &err);
                        warn!(host = %host, block_id, error = %err, "[node] collected block refused");
                        done.rejected = Some(block_id);
                        break 'fetch;
                    }
                }
            }
        }
        Ok(done)
    }

    /// Queue entries at or below the tip are settled.
    fn forget_stale_queue(&self) -> NodeResult<()> {
        let tip = self.ctx.tip_id();
        let stale = self
            .ctx
            .db
            .read(|t| t.queue_blocks().iter().any(|q| q.block_id <= tip));
        if stale {
            let mut dbtx = self.ctx.db.begin()?;
            dbtx.delete_old_queue_blocks(tip);
            dbtx.commit()?;
        }
        Ok(())
    }
}

#[async_trait]
impl Daemon for BlocksCollection {
    fn name(&self) -> &'static str {
        BLOCKS_COLLECTION
    }

    fn sleep_time(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn run(&self, dctx: &DaemonContext) -> Result<()> {
        match self.collect(dctx).await {
            Ok(done) => {
                if done.inserted + done.rolled_back > 0 {
                    info!(
                        inserted = done.inserted,
                        rolled_back = done.rolled_back,
                        tip = self.ctx.tip_id(),
                        "[node] blocks collected"
                    );
                }
                Ok(())
            }
            Err(NodeError::Block(BlockError::NetworkStopping)) => {
                warn!("[node] network stop played, shutting down");
                dctx.request_shutdown();
                Ok(())
            }
            Err(e) => Err(DaemonError::handler(BLOCKS_COLLECTION, e)),
        }
    }
}
