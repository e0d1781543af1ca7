//! # Rollback Service
//!
//! ```text
//!   tip N+k ... N+1 │ N
//!       ▲           │
//!       └─ rollback_block, newest first, in batches of max_tx_count
//! ```
//!
//! Each block is undone from its stored rollback rows, replayed in reverse
//! play order. Its transactions go back to the mempool as unverified so the
//! queue parser looks at them again.

use crate::error::{Result, RollbackError};
use hc_01_system_parameters::{ColumnCatalog, SystemParameters};
use hc_02_state_store::{Database, DbTransaction, PendingTx};
use hc_03_block_codec::unmarshal;
use hc_04_transaction_executor::domain::vm::CONTRACTS_TABLE;
use hc_04_transaction_executor::{
    undo_rollback_record, ContractVm, Transaction, SYSTEM_PARAMETERS_TABLE,
};
use hc_05_block_engine::stored_header;
use hc_telemetry::{CHAIN_HEIGHT, ROLLBACK_BLOCKS};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, NodeEvent};
use shared_types::{BlockHeader, InfoBlock};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What undoing one block touched outside its rows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RollbackEffects {
    pub sys_update: bool,
    pub touched_contracts: bool,
}

impl RollbackEffects {
    fn merge(&mut self, other: RollbackEffects) {
        self.sys_update |= other.sys_update;
        self.touched_contracts |= other.touched_contracts;
    }
}

pub struct RollbackService {
    db: Database,
    params: Arc<SystemParameters>,
    catalog: Arc<ColumnCatalog>,
    vm: Arc<Mutex<ContractVm>>,
    bus: Arc<dyn EventPublisher>,
}

impl RollbackService {
    pub fn new(
        db: Database,
        params: Arc<SystemParameters>,
        catalog: Arc<ColumnCatalog>,
        vm: Arc<Mutex<ContractVm>>,
        bus: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            db,
            params,
            catalog,
            vm,
            bus,
        }
    }

    /// Undo the tip block whose stored bytes are `data`.
    ///
    /// Returns the removed header. The VM is reloaded from `1_contracts` when
    /// the block touched contracts.
    pub fn rollback_block(
        &self,
        dbtx: &mut DbTransaction,
        vm: &mut ContractVm,
        data: &[u8],
    ) -> Result<(BlockHeader, RollbackEffects)> {
        let parsed = unmarshal(data)?;
        let block_id = parsed.header.block_id;
        let tip = dbtx.max_block().map(|b| b.id).unwrap_or(0);
        if block_id != tip {
            return Err(RollbackError::NotTip { block_id, tip });
        }
        let header = dbtx
            .block(block_id)
            .map(stored_header)
            .ok_or(RollbackError::BlockNotFound(block_id))??;

        let mut effects = RollbackEffects::default();
        let records = dbtx.rollback_records(block_id);
        for record in records.iter().rev() {
            undo_rollback_record(dbtx, record)?;
            if record.table_name == SYSTEM_PARAMETERS_TABLE {
                effects.sys_update = true;
            } else if record.table_name == CONTRACTS_TABLE {
                effects.touched_contracts = true;
            }
        }

        for raw in parsed.transactions.iter().rev() {
            let tx = Transaction::parse(&raw.data)?;
            dbtx.delete_log_transaction(&tx.hash);
            dbtx.set_tx_status_block(&tx.hash, 0, "");
            dbtx.requeue_transaction(PendingTx::new(
                tx.hash,
                tx.data.clone(),
                tx.tx_type(),
                tx.key_id(),
                tx.time(),
            ));
        }

        dbtx.delete_rollback_records(block_id);
        dbtx.delete_block(block_id)?;

        if effects.touched_contracts {
            *vm = ContractVm::load(&*dbtx);
        }
        debug!(
            block_id,
            rows = records.len(),
            txs = parsed.transactions.len(),
            "[hc-06] block rolled back"
        );
        Ok((header, effects))
    }

    /// Roll the chain back until `target` is the tip. Returns how many blocks
    /// were removed.
    pub fn to_block_id(&self, target: i64) -> Result<usize> {
        if target < 1 {
            return Err(RollbackError::InvalidTarget(target));
        }
        let batch = self.params.max_tx_count().max(1);

        let mut dbtx = self.db.begin()?;
        let mut vm = self.vm.lock();
        let unverified = dbtx.mark_verified_unused_unverified();

        let rewound = self.rewind(&mut dbtx, &mut vm, target, batch);
        let (removed, effects) = match rewound {
            Ok(done) => done,
            Err(err) => {
                dbtx.rollback();
                *vm = self.db.read(ContractVm::load);
                return Err(err);
            }
        };
        if removed == 0 {
            dbtx.rollback();
            return Ok(0);
        }

        if let Err(err) = dbtx.commit() {
            *vm = self.db.read(ContractVm::load);
            return Err(err.into());
        }
        drop(vm);

        if effects.sys_update {
            self.db.read(|t| -> Result<()> {
                self.params.refresh(t)?;
                self.catalog.refresh(t);
                Ok(())
            })?;
        }

        ROLLBACK_BLOCKS.inc_by(removed as f64);
        CHAIN_HEIGHT.set(target as f64);
        info!(target, removed, unverified, "[hc-06] ⏪ chain rolled back");
        self.bus.publish(NodeEvent::RolledBack {
            block_id: target,
            removed,
        });
        Ok(removed)
    }

    fn rewind(
        &self,
        dbtx: &mut DbTransaction,
        vm: &mut ContractVm,
        target: i64,
        batch: usize,
    ) -> Result<(usize, RollbackEffects)> {
        let mut removed = 0;
        let mut effects = RollbackEffects::default();
        loop {
            let blocks = dbtx.blocks_desc_above(target, batch);
            if blocks.is_empty() {
                break;
            }
            for row in blocks {
                let (_, undone) = self.rollback_block(dbtx, vm, &row.data).map_err(|e| {
                    error!(block_id = row.id, error = %e, "[hc-06] rolling back block");
                    e
                })?;
                effects.merge(undone);
                removed += 1;
            }
        }
        if removed == 0 {
            return Ok((0, effects));
        }

        let tip = dbtx
            .block(target)
            .map(stored_header)
            .ok_or(RollbackError::BlockNotFound(target))??;
        let mut info = InfoBlock::from_header(&tip);
        info.sent = true;
        dbtx.update_info_block(info);
        Ok((removed, effects))
    }

    /// Lowest tip reachable from `tip` given `rollback_blocks`.
    pub fn rollback_floor(&self, tip: i64) -> i64 {
        let depth = self.params.rollback_blocks();
        if depth <= 0 {
            warn!("[hc-06] rollback_blocks is not set, rollback limited to one block");
            return (tip - 1).max(1);
        }
        (tip - depth).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hc_03_block_codec::marshal;
    use hc_04_transaction_executor::{first_block, smart_call, Executor, TxBanList, TxHeader};
    use hc_05_block_engine::{BlockEngine, EngineConfig, EngineDependencies, ManualClock, BLOCK_VERSION};
    use parking_lot::RwLock;
    use shared_bus::{EventFilter, InMemoryEventBus};
    use shared_crypto::{key_id_from_public, Ed25519KeyPair};
    use std::time::Duration;

    const T0: i64 = 1_700_000_000;

    fn founder() -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed([1; 32])
    }

    struct Chain {
        engine: BlockEngine,
        rollback: RollbackService,
        bus: Arc<InMemoryEventBus>,
        blocks: Vec<Vec<u8>>,
    }

    impl Chain {
        fn new() -> Self {
            let key = founder();
            let params = Arc::new(SystemParameters::new(key.public_key().as_bytes().to_vec(), vec![]));
            let catalog = Arc::new(ColumnCatalog::new());
            let vm = Arc::new(Mutex::new(ContractVm::new()));
            let bus = Arc::new(InMemoryEventBus::new());
            let db = Database::in_memory();
            let engine = BlockEngine::new(EngineDependencies {
                db: db.clone(),
                params: params.clone(),
                catalog: catalog.clone(),
                executor: Arc::new(Executor::new(params.clone(), catalog.clone())),
                vm: vm.clone(),
                node_key: Arc::new(RwLock::new(key.clone())),
                bus: bus.clone(),
                tx_bans: Arc::new(TxBanList::new(3, Duration::from_secs(60))),
                config: EngineConfig::default(),
            })
            .with_time_source(Arc::new(ManualClock::new(T0 + 10_000)));
            let rollback = RollbackService::new(db, params, catalog, vm, bus.clone());

            let genesis = first_block(&key, key.public_key().as_bytes().to_vec(), T0, 1_000_000, true, false).unwrap();
            let mut chain = Self {
                engine,
                rollback,
                bus,
                blocks: Vec::new(),
            };
            chain.push(BlockHeader::default(), T0, &[genesis.data]);
            chain
        }

        fn push(&mut self, prev: BlockHeader, time: i64, txs: &[Vec<u8>]) {
            let key = founder();
            let header = BlockHeader {
                block_id: prev.block_id + 1,
                time,
                ecosystem_id: 1,
                key_id: key_id_from_public(key.public_key().as_bytes()),
                node_position: 0,
                version: BLOCK_VERSION,
                ..Default::default()
            };
            let (bytes, _) = marshal(&header, txs, &prev, &key).unwrap();
            self.engine
                .insert_block_wo_forks(&bytes, false, header.block_id == 1)
                .unwrap();
            self.blocks.push(bytes);
        }

        fn call(&mut self, contract: &str, params: &[(&str, &str)]) {
            let key = founder();
            let tip = self.engine.last_block().unwrap().unwrap();
            let tx = smart_call(
                &key,
                TxHeader::for_key(&key, tip.time + 1, 1, 1),
                contract,
                params,
            )
            .unwrap();
            self.push(tip.clone(), tip.time + 4, &[tx.data]);
        }

        fn info(&self) -> InfoBlock {
            self.engine.database().read(|t| t.info_block().cloned()).unwrap()
        }
    }

    #[test]
    fn test_rollback_restores_rows_and_requeues() {
        let mut chain = Chain::new();
        chain.call("MoneyTransfer", &[("recipient", "10"), ("amount", "100")]);
        let after_first_call = chain.info();
        chain.call("MoneyTransfer", &[("recipient", "10"), ("amount", "50")]);
        let mut events = chain.bus.subscribe(EventFilter::all());

        assert_eq!(chain.rollback.to_block_id(2).unwrap(), 1);
        let db = chain.engine.database();
        db.read(|t| {
            assert_eq!(t.info_block().unwrap().block_id, 2);
            assert_eq!(t.row("1_keys", "10").unwrap().get("amount").unwrap(), "100");
            assert!(t.block(3).is_none());
            assert!(t.rollback_records(3).is_empty());
            let pending = t.unverified_transactions(10);
            assert_eq!(pending.len(), 1);
            assert!(t.log_transaction(&pending[0].hash).is_none());
        });
        assert_eq!(after_first_call.block_id, 2);
        assert!(events.drain().contains(&NodeEvent::RolledBack {
            block_id: 2,
            removed: 1
        }));
    }

    #[test]
    fn test_rollback_to_tip_is_a_no_op() {
        let chain = Chain::new();
        assert_eq!(chain.rollback.to_block_id(1).unwrap(), 0);
        assert!(matches!(
            chain.rollback.to_block_id(0),
            Err(RollbackError::InvalidTarget(0))
        ));
    }

    #[test]
    fn test_only_the_tip_can_be_undone() {
        let mut chain = Chain::new();
        chain.call("MoneyTransfer", &[("recipient", "10"), ("amount", "1")]);
        chain.call("MoneyTransfer", &[("recipient", "10"), ("amount", "1")]);
        let db = chain.engine.database().clone();
        let mut dbtx = db.begin().unwrap();
        let mut vm = ContractVm::new();
        let err = chain
            .rollback
            .rollback_block(&mut dbtx, &mut vm, &chain.blocks[1])
            .unwrap_err();
        assert!(matches!(err, RollbackError::NotTip { block_id: 2, tip: 3 }));
    }

    #[test]
    fn test_rollback_reverts_parameters_and_contracts() {
        let mut chain = Chain::new();
        chain.call("UpdateSysParam", &[("name", "max_tx_block"), ("value", "5")]);
        chain.call("NewContract", &[("name", "Hello"), ("value", "greet")]);
        assert!(chain.engine.vm().lock().contains("Hello"));
        assert_eq!(chain.engine.params().max_tx_block(), 5);

        chain.rollback.to_block_id(1).unwrap();
        assert!(!chain.engine.vm().lock().contains("Hello"));
        assert_eq!(chain.engine.params().max_tx_block(), 1000);
    }

    #[test]
    fn test_replay_after_rollback_reproduces_tip() {
        let mut chain = Chain::new();
        for amount in ["10", "20", "30", "40"] {
            chain.call("MoneyTransfer", &[("recipient", "10"), ("amount", amount)]);
        }
        let before = chain.info();

        chain.rollback.to_block_id(2).unwrap();
        for bytes in chain.blocks[2..].to_vec() {
            chain.engine.insert_block_wo_forks(&bytes, false, false).unwrap();
        }
        let after = chain.info();
        assert_eq!(after.hash, before.hash);
        assert_eq!(after.rollbacks_hash, before.rollbacks_hash);
    }

    #[test]
    fn test_rollback_floor() {
        let chain = Chain::new();
        let depth = chain.engine.params().rollback_blocks();
        assert_eq!(chain.rollback.rollback_floor(depth + 50), 50);
        assert_eq!(chain.rollback.rollback_floor(3), 1);
    }
}
