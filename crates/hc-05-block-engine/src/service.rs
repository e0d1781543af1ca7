//! # Block Engine Service
//!
//! ```text
//!   bytes ──process_block──> Block(Unmarshalled)
//!                               │ check: time, slot, signature, tx scan
//!                               ▼
//!                           Block(Checked)
//!                               │ play_safe: begin ─> play ─> rollbacks hash
//!                               │            ─> info_block ─> block_chain ─> commit
//!                               ▼
//!                           Block(Committed) ──> BlockCommitted, notifications
//! ```
//!
//! Callers serialize writers with the node-wide DB lock; the engine itself
//! assumes it is the only writer while a block is in flight.

use crate::config::{EngineConfig, SysUpdatePolicy};
use crate::domain::{
    rollbacks_hash, stored_header, Block, BlockState, BlockTimeCounter, LimitMode, Limits,
    BLOCK_VERSION,
};
use crate::error::{BlockError, LimitError, Result};
use crate::ports::{SystemTimeSource, TimeSource};
use hc_01_system_parameters::{ColumnCatalog, SystemParameters};
use hc_02_state_store::{Database, DbTransaction, PendingTx, RollbackRecord};
use hc_03_block_codec::{marshal, unmarshal, unmarshal_limited};
use hc_04_transaction_executor::{
    undo_all, BlockScope, ContractVm, Executor, FlushRecord, PlayContext, PlayOutcome,
    Transaction, TxBanList,
};
use hc_telemetry::{
    time_histogram, BLOCKS_COMMITTED, BLOCKS_REJECTED, BLOCK_PLAY_DURATION, CHAIN_HEIGHT,
    TRANSACTIONS_PLAYED,
};
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, NodeEvent};
use shared_crypto::{key_id_from_public, verify_signature, CryptoError, Ed25519KeyPair};
use shared_types::{BlockHeader, Hash, InfoBlock, Notification, SYSTEM_ECOSYSTEM};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Dependencies for BlockEngine
pub struct EngineDependencies {
    pub db: Database,
    pub params: Arc<SystemParameters>,
    pub catalog: Arc<ColumnCatalog>,
    pub executor: Arc<Executor>,
    pub vm: Arc<Mutex<ContractVm>>,
    pub node_key: Arc<RwLock<Ed25519KeyPair>>,
    pub bus: Arc<dyn EventPublisher>,
    pub tx_bans: Arc<TxBanList>,
    pub config: EngineConfig,
}

/// What a played block leaves behind besides its database writes.
#[derive(Default)]
struct PlayAccumulator {
    processed: Vec<Transaction>,
    rollback: Vec<RollbackRecord>,
    flush: Vec<FlushRecord>,
    notifications: Vec<Notification>,
}

/// Orchestrates check, play and commit of blocks.
pub struct BlockEngine {
    db: Database,
    params: Arc<SystemParameters>,
    catalog: Arc<ColumnCatalog>,
    executor: Arc<Executor>,
    vm: Arc<Mutex<ContractVm>>,
    node_key: Arc<RwLock<Ed25519KeyPair>>,
    bus: Arc<dyn EventPublisher>,
    tx_bans: Arc<TxBanList>,
    config: EngineConfig,
    clock: Arc<dyn TimeSource>,
}

impl BlockEngine {
    pub fn new(deps: EngineDependencies) -> Self {
        Self {
            db: deps.db,
            params: deps.params,
            catalog: deps.catalog,
            executor: deps.executor,
            vm: deps.vm,
            node_key: deps.node_key,
            bus: deps.bus,
            tx_bans: deps.tx_bans,
            config: deps.config,
            clock: Arc::new(SystemTimeSource),
        }
    }

    /// Set custom time source (for testing)
    pub fn with_time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn params(&self) -> &Arc<SystemParameters> {
        &self.params
    }

    pub fn vm(&self) -> &Arc<Mutex<ContractVm>> {
        &self.vm
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Header of the committed tip, `None` before genesis.
    pub fn last_block(&self) -> Result<Option<BlockHeader>> {
        self.db
            .read(|t| t.max_block().cloned())
            .map(|row| stored_header(&row))
            .transpose()
    }

    /// Slot counter for the committed chain, `None` before genesis.
    pub fn time_counter(&self) -> Option<BlockTimeCounter> {
        self.db.read(|t| BlockTimeCounter::from_chain(&self.params, t))
    }

    // =========================================================================
    // UNMARSHAL
    // =========================================================================

    /// Decode block bytes and attach the previous header from `block_chain`.
    pub fn process_block(&self, data: &[u8], check_size: bool) -> Result<Block> {
        let parsed = if check_size && self.config.check_block_size {
            unmarshal_limited(data, self.params.max_block_size().max(0) as usize)?
        } else {
            unmarshal(data)?
        };
        let mut block = Block::from_parsed(parsed)?;
        if block.id() < 1 {
            return Err(BlockError::UnmarshallBlock(format!(
                "block id {} out of range",
                block.id()
            )));
        }

        let prev = if block.is_genesis() {
            BlockHeader::default()
        } else {
            let prev = self.load_header(block.id() - 1)?;
            block.prev_header = Some(prev.clone());
            prev
        };
        block.compute_hash(&prev);
        Ok(block)
    }

    fn load_header(&self, block_id: i64) -> Result<BlockHeader> {
        let row = self
            .db
            .read(|t| t.block(block_id).cloned())
            .ok_or(BlockError::PrevBlockMissing(block_id))?;
        stored_header(&row)
    }

    // =========================================================================
    // CHECK
    // =========================================================================

    /// Pre-commit validation. The genesis block skips every check.
    pub fn check(&self, block: &mut Block) -> Result<()> {
        if block.is_genesis() {
            block.state = BlockState::Checked;
            return Ok(());
        }

        let prev = match &block.prev_header {
            Some(prev) if prev.block_id + 1 == block.id() => prev.clone(),
            _ => {
                let prev = self.load_header(block.id() - 1)?;
                block.compute_hash(&prev);
                block.prev_header = Some(prev.clone());
                prev
            }
        };
        if self.db.read(|t| t.block(block.id()).is_some()) {
            return Err(BlockError::AlreadyExists(block.id()));
        }

        let now = self.clock.now();
        if block.header.time > now {
            return Err(BlockError::FutureTime {
                time: block.header.time,
                now,
            });
        }
        let taken = self.db.read(|t| {
            BlockTimeCounter::from_chain(&self.params, t)
                .map(|c| c.block_for_time_exists(t, block.header.time, block.header.node_position))
        });
        if taken != Some(false) {
            return Err(BlockError::IncorrectBlockTime {
                time: block.header.time,
                position: block.header.node_position,
            });
        }

        self.check_sign(block, &prev)?;
        self.check_transactions(block)?;

        block.state = BlockState::Checked;
        Ok(())
    }

    fn check_sign(&self, block: &Block, prev: &BlockHeader) -> Result<()> {
        let public_key = self
            .params
            .node_public_key_by_position(block.header.node_position)
            .map_err(BlockError::UnknownNode)?;
        let forsign = block.for_sign(prev);
        Limits::new(&self.params, LimitMode::Parsing).check_forsign(&forsign)?;

        match verify_signature(&public_key, forsign.as_bytes(), &block.header.sign) {
            Ok(()) => Ok(()),
            Err(CryptoError::IncorrectSign) if block.prev_rollbacks_hash != prev.rollbacks_hash => {
                Err(BlockError::IncorrectRollbackHash)
            }
            Err(err) => Err(BlockError::IncorrectSign(err)),
        }
    }

    fn check_transactions(&self, block: &Block) -> Result<()> {
        let max_user = self.params.max_block_user_tx();
        let mut seen = HashSet::with_capacity(block.transactions.len());
        let mut per_user: HashMap<i64, usize> = HashMap::new();

        for tx in &block.transactions {
            if !seen.insert(tx.hash) {
                return Err(BlockError::DuplicateTransaction(hex::encode(tx.hash)));
            }
            // while generating the limits meter defers instead
            if !block.gen_block {
                let count = per_user.entry(tx.key_id()).or_insert(0);
                *count += 1;
                if max_user > 0 && *count > max_user {
                    return Err(BlockError::UserLimit {
                        key_id: tx.key_id(),
                        count: *count,
                        max: max_user,
                    });
                }
            }
            tx.check_time(block.header.time)
                .map_err(|e| BlockError::from_exec(&tx.hash, e))?;
        }
        Ok(())
    }

    // =========================================================================
    // PLAY
    // =========================================================================

    /// Play every transaction of `block` inside `dbtx`, each under its own
    /// `mark_block_<i>` savepoint.
    fn play(
        &self,
        block: &mut Block,
        dbtx: &mut DbTransaction,
        vm: &mut ContractVm,
        acc: &mut PlayAccumulator,
    ) -> Result<()> {
        let gen = block.gen_block;
        let mode = if gen { LimitMode::GenBlock } else { LimitMode::Parsing };
        let mut limits = Limits::new(&self.params, mode);
        let scope = BlockScope {
            block_id: block.id(),
            block_time: block.header.time,
            deadline: limits.deadline(),
        };
        let input = block.transactions.clone();

        for (cur, tx) in input.iter().enumerate() {
            let savepoint = format!("mark_block_{cur}");
            dbtx.savepoint(&savepoint);

            let PlayOutcome {
                flush,
                sys_update,
                result,
            } = self.executor.play(
                &mut PlayContext {
                    db: &mut *dbtx,
                    vm: &mut *vm,
                    block: scope,
                },
                tx,
            );
            let played = match result {
                Ok(effects) if tx.is_smart() => limits
                    .check_tx(tx, effects.fuel_used)
                    .map(|()| effects)
                    .map_err(BlockError::from),
                Ok(effects) => Ok(effects),
                Err(err) => Err(BlockError::from_exec(&tx.hash, err)),
            };

            let effects = match played {
                Ok(effects) => effects,
                Err(err) => {
                    undo_all(vm, &flush);
                    if matches!(err, BlockError::NetworkStopping) {
                        return Err(err);
                    }
                    dbtx.rollback_to_savepoint(&savepoint)?;
                    dbtx.release_savepoint(&savepoint)?;

                    let err = if gen && err.is_time_limit() {
                        BlockError::Limit(LimitError::Time)
                    } else {
                        err
                    };
                    if gen {
                        match err {
                            BlockError::Limit(LimitError::Stop(_)) if cur == 0 => return Err(err),
                            BlockError::Limit(LimitError::Stop(ref reason)) => {
                                debug!(block_id = block.id(), reason, "[hc-05] block is full");
                                break;
                            }
                            BlockError::Limit(LimitError::Defer(ref reason)) => {
                                debug!(tx_hash = %hex::encode(tx.hash), reason, "[hc-05] tx left for a later block");
                                TRANSACTIONS_PLAYED.with_label_values(&["skipped"]).inc();
                                continue;
                            }
                            _ => {}
                        }
                    }

                    dbtx.mark_transaction_bad(&tx.hash, tx.key_id(), &err.to_string(), block.header.time);
                    TRANSACTIONS_PLAYED.with_label_values(&["bad"]).inc();
                    if sys_update {
                        block.sys_update = true;
                    }
                    if gen {
                        warn!(tx_hash = %hex::encode(tx.hash), error = %err, "[hc-05] dropping bad tx from generated block");
                        self.tx_bans.record_bad(tx.key_id());
                        continue;
                    }
                    return Err(err);
                }
            };

            dbtx.release_savepoint(&savepoint)?;
            if effects.sys_update {
                block.sys_update = true;
            }
            dbtx.set_tx_status_block(&tx.hash, block.id(), &effects.message);
            acc.notifications.extend(effects.notifications);
            for mut row in effects.rollback {
                row.seq = acc.rollback.len() as u32;
                acc.rollback.push(row);
            }
            acc.flush.extend(flush);
            acc.processed.push(tx.clone());
            TRANSACTIONS_PLAYED.with_label_values(&["ok"]).inc();
        }

        if gen {
            block.transactions = acc.processed.clone();
        }

        let used: Vec<Hash> = acc.processed.iter().map(|t| t.hash).collect();
        for hash in &used {
            dbtx.delete_pending_tx(hash);
        }
        dbtx.create_log_transactions(&used, block.id());
        dbtx.insert_rollback_records(acc.rollback.clone());
        Ok(())
    }

    // =========================================================================
    // PLAY SAFE
    // =========================================================================

    /// Play and commit `block` in one database transaction.
    pub fn play_safe(&self, block: &mut Block) -> Result<()> {
        let _timer = time_histogram!(BLOCK_PLAY_DURATION);
        block.state = BlockState::Playing;

        let mut dbtx = self.db.begin()?;
        let input = block.transactions.clone();
        let mut acc = PlayAccumulator::default();

        let played = {
            let mut vm = self.vm.lock();
            let played = self.play(block, &mut dbtx, &mut vm, &mut acc);
            if played.is_err() {
                undo_all(&mut vm, &acc.flush);
            }
            played
        };

        if let Err(err) = played {
            dbtx.rollback();
            return Err(self.play_failed(block, &input, err, acc.processed.is_empty()));
        }

        if block.gen_block && acc.processed.is_empty() {
            // keep the bad marks
            dbtx.commit()?;
            return Err(BlockError::EmptyBlock);
        }

        if let Err(err) = self.persist(block, dbtx, &acc) {
            undo_all(&mut self.vm.lock(), &acc.flush);
            return Err(err);
        }

        block.state = BlockState::Committed;
        block.notifications = acc.notifications;
        BLOCKS_COMMITTED.inc();
        CHAIN_HEIGHT.set(block.id() as f64);
        info!(
            block_id = block.id(),
            hash = %block.header.hash_hex(),
            txs = block.transactions.len(),
            generated = block.gen_block,
            "[hc-05] ✅ block committed"
        );

        self.bus.publish(NodeEvent::BlockCommitted {
            block_id: block.id(),
            hash: block.header.hash,
            tx_count: block.transactions.len(),
            generated: block.gen_block,
        });
        for notification in &block.notifications {
            self.bus.publish(NodeEvent::Notification(notification.clone()));
        }
        Ok(())
    }

    fn play_failed(&self, block: &Block, input: &[Transaction], err: BlockError, nothing_played: bool) -> BlockError {
        if matches!(err, BlockError::NetworkStopping) {
            warn!(block_id = block.id(), "[hc-05] 🛑 network stop requested");
            self.bus.publish(NodeEvent::NetworkStopping {
                block_id: block.id(),
            });
            return err;
        }
        if !(block.gen_block && nothing_played) {
            return err;
        }

        let err = match err {
            BlockError::Limit(LimitError::Stop(_)) => BlockError::Limit(LimitError::Time),
            other => other,
        };
        // this transaction alone cannot fit in a block
        if let Some(first) = input.first() {
            self.tx_bans.ban(first.key_id());
            if let Err(e) = self.mark_bad_committed(first, &err.to_string(), block.header.time) {
                error!(error = %e, "[hc-05] marking transaction bad");
            }
        }
        err
    }

    fn mark_bad_committed(&self, tx: &Transaction, reason: &str, time: i64) -> Result<()> {
        let mut dbtx = self.db.begin()?;
        dbtx.mark_transaction_bad(&tx.hash, tx.key_id(), reason, time);
        dbtx.commit()?;
        Ok(())
    }

    fn persist(&self, block: &mut Block, mut dbtx: DbTransaction, acc: &PlayAccumulator) -> Result<()> {
        let prev = block.prev_header.clone().unwrap_or_default();
        if block.gen_block && block.transactions.len() != block_input_len(block) {
            self.repeat_marshal(block, &prev)?;
        }

        block.header.rollbacks_hash = rollbacks_hash(&prev.rollbacks_hash, &acc.rollback);
        let mut info = InfoBlock::from_header(&block.header);
        // only the producer pushes its block
        info.sent = !block.gen_block;
        dbtx.update_info_block(info);
        dbtx.insert_block(block.to_row())?;

        let inside = self.config.sys_update_policy == SysUpdatePolicy::InsideTransaction;
        if block.sys_update && inside {
            self.params.refresh(&dbtx)?;
            self.catalog.refresh(&dbtx);
        }

        if let Err(err) = dbtx.commit() {
            if block.sys_update && inside {
                if let Err(e) = self.reload_parameters() {
                    error!(error = %e, "[hc-05] reloading parameters after failed commit");
                }
            }
            return Err(err.into());
        }

        // the block is committed from here on
        if block.sys_update && !inside {
            if let Err(e) = self.reload_parameters() {
                error!(block_id = block.id(), error = %e, "[hc-05] reloading parameters after commit");
            }
        }
        Ok(())
    }

    /// Refresh the parameter cache and the byte-column catalog from committed state.
    pub fn reload_parameters(&self) -> Result<()> {
        self.db.read(|t| -> Result<()> {
            self.params.refresh(t)?;
            self.catalog.refresh(t);
            Ok(())
        })
    }

    /// Re-sign a generated block whose transaction list shrank.
    fn repeat_marshal(&self, block: &mut Block, prev: &BlockHeader) -> Result<()> {
        let (bytes, _) = {
            let key = self.node_key.read();
            marshal(&block.header, &block.tx_data(), prev, &key)?
        };
        let parsed = unmarshal(&bytes)?;
        block.header.sign = parsed.header.sign;
        block.merkle_root = parsed.merkle_root;
        block.bin_data = parsed.bin_data;
        block.compute_hash(prev);
        debug!(
            block_id = block.id(),
            txs = block.transactions.len(),
            "[hc-05] generated block re-marshalled"
        );
        Ok(())
    }

    // =========================================================================
    // ENTRY POINTS
    // =========================================================================

    /// Decode, check and commit a block without fork handling.
    ///
    /// `first_block` skips the size ceiling, used for genesis loading.
    pub fn insert_block_wo_forks(&self, data: &[u8], gen_block: bool, first_block: bool) -> Result<BlockHeader> {
        let result = self.insert(data, gen_block, first_block);
        if let Err(err) = &result {
            if !gen_block {
                self.rejected(data, err);
            }
        }
        result
    }

    fn insert(&self, data: &[u8], gen_block: bool, first_block: bool) -> Result<BlockHeader> {
        let mut block = self.process_block(data, !first_block)?;
        block.gen_block = gen_block;
        self.check(&mut block)?;
        self.play_safe(&mut block)?;
        Ok(block.header)
    }

    fn rejected(&self, data: &[u8], err: &BlockError) {
        let kind = err.reject_kind();
        let bannable = err.is_bannable();
        let block_id = unmarshal(data).map(|p| p.header.block_id).unwrap_or(0);
        BLOCKS_REJECTED.with_label_values(&[kind.as_str()]).inc();
        warn!(block_id, kind = kind.as_str(), bannable, error = %err, "[hc-05] ❌ block rejected");
        self.bus.publish(NodeEvent::BlockRejected {
            block_id,
            kind,
            bannable,
            reason: err.to_string(),
        });
    }

    /// Build, sign and commit a block from mempool candidates.
    ///
    /// Candidates that fail to parse, verify or fit the block time are marked
    /// bad before generation.
    pub fn generate_block(&self, time: i64, candidates: &[PendingTx]) -> Result<BlockHeader> {
        let position = self
            .params
            .this_node_position()
            .map_err(|_| BlockError::NotHonorNode)?;
        let prev = self.last_block()?.ok_or(BlockError::PrevBlockMissing(0))?;

        let mut tx_data = Vec::with_capacity(candidates.len());
        let mut bad = Vec::new();
        for candidate in candidates {
            match Transaction::parse_verified(&candidate.data).and_then(|tx| tx.check_time(time).map(|()| tx)) {
                Ok(tx) => tx_data.push(tx.data),
                Err(e) => bad.push((candidate, e.to_string())),
            }
        }
        if !bad.is_empty() {
            let mut dbtx = self.db.begin()?;
            for (candidate, reason) in &bad {
                dbtx.mark_transaction_bad(&candidate.hash, candidate.key_id, reason, time);
            }
            dbtx.commit()?;
        }
        if tx_data.is_empty() {
            return Err(BlockError::EmptyBlock);
        }

        let key = self.node_key.read().clone();
        let header = BlockHeader {
            block_id: prev.block_id + 1,
            time,
            ecosystem_id: SYSTEM_ECOSYSTEM,
            key_id: key_id_from_public(key.public_key().as_bytes()),
            node_position: position,
            version: BLOCK_VERSION,
            ..Default::default()
        };
        let (bytes, _) = marshal(&header, &tx_data, &prev, &key)?;
        debug!(block_id = header.block_id, txs = tx_data.len(), "[hc-05] generating block");
        self.insert_block_wo_forks(&bytes, true, false)
    }
}

/// Transactions carried by the block bytes before generation dropped any.
fn block_input_len(block: &Block) -> usize {
    unmarshal(&block.bin_data)
        .map(|p| p.transactions.len())
        .unwrap_or(0)
}
