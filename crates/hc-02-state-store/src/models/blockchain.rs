//! `block_chain`, `info_block` and `queue_blocks`.

use crate::domain::rows::{BlockRow, QueueBlock};
use crate::domain::tables::Tables;
use crate::error::{DbError, Result};
use crate::service::DbTransaction;
use shared_types::{Hash, InfoBlock};
use std::sync::Arc;

impl Tables {
    pub fn info_block(&self) -> Option<&InfoBlock> {
        self.info_block.as_ref()
    }

    /// The info-block if it has not been disseminated yet.
    pub fn unsent_info_block(&self) -> Option<&InfoBlock> {
        self.info_block.as_ref().filter(|info| !info.sent && info.block_id > 0)
    }

    pub fn block(&self, id: i64) -> Option<&BlockRow> {
        self.block_chain.get(&id)
    }

    /// Row with the highest id.
    pub fn max_block(&self) -> Option<&BlockRow> {
        self.block_chain.values().next_back()
    }

    pub fn block_count(&self) -> usize {
        self.block_chain.len()
    }

    /// Blocks with id greater than `above`, newest first, at most `limit`.
    pub fn blocks_desc_above(&self, above: i64, limit: usize) -> Vec<BlockRow> {
        self.block_chain
            .range(above + 1..)
            .rev()
            .take(limit)
            .map(|(_, row)| row.clone())
            .collect()
    }

    /// Up to `count` consecutive blocks starting at `from`.
    pub fn blocks_from(&self, from: i64, count: usize) -> Vec<BlockRow> {
        self.block_chain
            .range(from..)
            .take(count)
            .map(|(_, row)| row.clone())
            .collect()
    }

    /// Blocks whose time lies in `[from, to)`.
    pub fn blocks_in_time_range(&self, from: i64, to: i64) -> Vec<&BlockRow> {
        self.block_chain
            .values()
            .filter(|row| row.time >= from && row.time < to)
            .collect()
    }

    pub fn queue_blocks(&self) -> Vec<QueueBlock> {
        let mut queued: Vec<QueueBlock> = self.queue_blocks.values().cloned().collect();
        queued.sort_by_key(|q| q.block_id);
        queued
    }
}

impl DbTransaction {
    pub fn update_info_block(&mut self, info: InfoBlock) {
        self.tables_mut().info_block = Some(info);
    }

    pub fn mark_info_block_sent(&mut self) {
        if let Some(info) = self.tables_mut().info_block.as_mut() {
            info.sent = true;
        }
    }

    /// Append a block. Ids are unique.
    pub fn insert_block(&mut self, row: BlockRow) -> Result<()> {
        let chain = Arc::make_mut(&mut self.tables_mut().block_chain);
        if chain.contains_key(&row.id) {
            return Err(DbError::Duplicate {
                table: "block_chain".into(),
                key: row.id.to_string(),
            });
        }
        chain.insert(row.id, row);
        Ok(())
    }

    pub fn delete_block(&mut self, id: i64) -> Result<BlockRow> {
        Arc::make_mut(&mut self.tables_mut().block_chain)
            .remove(&id)
            .ok_or_else(|| DbError::RowNotFound {
                table: "block_chain".into(),
                id: id.to_string(),
            })
    }

    pub fn create_queue_block(&mut self, queued: QueueBlock) {
        Arc::make_mut(&mut self.tables_mut().queue_blocks).insert(queued.hash, queued);
    }

    pub fn delete_queue_block(&mut self, hash: &Hash) -> bool {
        Arc::make_mut(&mut self.tables_mut().queue_blocks)
            .remove(hash)
            .is_some()
    }

    /// Drop queued announcements at or below the current tip.
    pub fn delete_old_queue_blocks(&mut self, tip: i64) -> usize {
        let queue = Arc::make_mut(&mut self.tables_mut().queue_blocks);
        let before = queue.len();
        queue.retain(|_, q| q.block_id > tip);
        before - queue.len()
    }
}
