//! # Node Daemons
//!
//! | Daemon | Sleep | Job |
//! |--------|-------|-----|
//! | `Disseminator` | 1s | push unsent block and txs to peers |
//! | `BlockGenerator` | 1s | produce a block in this node's slot |
//! | `BlocksCollection` | 5s | catch up with the highest peer, roll back on forks |
//! | `QueueParserTx` | 1s | verify incoming mempool transactions |
//!
//! All of them share the node's `db_lock` for writes.

mod block_generator;
mod blocks_collection;
mod disseminator;
mod queue_parser_tx;

pub use block_generator::BlockGenerator;
pub use blocks_collection::{BlocksCollection, COLLECTION_BATCH};
pub use disseminator::DisseminatorDaemon;
pub use queue_parser_tx::{QueueParserTx, VERIFY_BATCH};

use crate::context::NodeContext;
use hc_08_daemons::DaemonRegistry;
use std::sync::Arc;

pub const DISSEMINATOR: &str = "Disseminator";
pub const BLOCK_GENERATOR: &str = "BlockGenerator";
pub const BLOCKS_COLLECTION: &str = "BlocksCollection";
pub const QUEUE_PARSER_TX: &str = "QueueParserTx";

/// Every daemon the node knows about.
pub fn register_daemons(ctx: &Arc<NodeContext>) -> DaemonRegistry {
    let mut registry = DaemonRegistry::new();
    registry.register(Arc::new(DisseminatorDaemon::new(ctx.clone())));
    registry.register(Arc::new(BlockGenerator::new(ctx.clone())));
    registry.register(Arc::new(BlocksCollection::new(ctx.clone())));
    registry.register(Arc::new(QueueParserTx::new(ctx.clone())));
    registry
}
