use super::BLOCK_GENERATOR;
use crate::context::NodeContext;
use async_trait::async_trait;
use hc_05_block_engine::BlockError;
use hc_08_daemons::{Daemon, DaemonContext, DaemonError, Result};
use shared_types::BlockHeader;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Produces a block from verified mempool transactions when this node owns
/// the current slot.
pub struct BlockGenerator {
    ctx: Arc<NodeContext>,
}

impl BlockGenerator {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self { ctx }
    }

    /// One attempt at `now`. `None` when it was not this node's turn or
    /// there was nothing to put in a block.
    pub async fn generate_at(&self, now: i64) -> std::result::Result<Option<BlockHeader>, BlockError> {
        let ctx = &self.ctx;
        let Ok(position) = ctx.params.this_node_position() else {
            return Ok(None);
        };
        let Some(counter) = ctx.engine.time_counter() else {
            return Ok(None);
        };
        if !counter.time_to_generate(now, position) {
            return Ok(None);
        }

        let _guard = ctx.db_lock.lock().await;
        let (taken, candidates) = ctx.db.read(|t| {
            (
                counter.block_for_time_exists(t, now, position),
                t.verified_unused_transactions(ctx.params.max_tx_count()),
            )
        });
        if taken || candidates.is_empty() {
            return Ok(None);
        }

        match ctx.engine.generate_block(now, &candidates) {
            Ok(header) => {
                hc_telemetry::log_block_event!(
                    info,
                    "node",
                    "[node] ⛏️ block generated",
                    header.block_id,
                    hex::encode(header.hash),
                    candidates = candidates.len()
                );
                Ok(Some(header))
            }
            Err(BlockError::EmptyBlock) => {
                debug!(candidates = candidates.len(), "[node] every candidate dropped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Daemon for BlockGenerator {
    fn name(&self) -> &'static str {
        BLOCK_GENERATOR
    }

    fn sleep_time(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn run(&self, dctx: &DaemonContext) -> Result<()> {
        match self.generate_at(self.ctx.now()).await {
            Ok(_) => Ok(()),
            Err(BlockError::NetworkStopping) => {
                warn!("[node] network stop played, shutting down");
                dctx.request_shutdown();
                Ok(())
            }
            Err(e) => Err(DaemonError::handler(BLOCK_GENERATOR, e)),
        }
    }
}
