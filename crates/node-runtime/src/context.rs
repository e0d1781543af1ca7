//! # Node Context
//!
//! The long-lived singletons of a running node, built once and passed
//! explicitly to the API, the TCP server and every daemon.
//!
//! | Field | Guard |
//! |-------|-------|
//! | parameter cache | internal `RwLock` |
//! | node key | `RwLock` |
//! | contract VM | `Mutex` |
//! | writers | `db_lock` (tokio `Mutex`) |
//!
//! Lock order is always `db_lock`, then the parameter cache, then the VM.

use crate::config::NodeConfig;
use crate::error::Result;
use crate::genesis::restore_first_block_data;
use hc_01_system_parameters::{ColumnCatalog, SystemParameters};
use hc_02_state_store::Database;
use hc_04_transaction_executor::{ContractVm, Executor, TxBanList};
use hc_05_block_engine::{BlockEngine, BlockError, EngineDependencies, SystemTimeSource, TimeSource};
use hc_06_rollback::RollbackService;
use hc_07_dissemination::{BanService, PeerTransport};
use parking_lot::{Mutex, RwLock};
use shared_bus::InMemoryEventBus;
use shared_crypto::Ed25519KeyPair;
use std::sync::Arc;
use tracing::{info, warn};

pub struct NodeContext {
    pub config: NodeConfig,
    pub db: Database,
    pub params: Arc<SystemParameters>,
    pub catalog: Arc<ColumnCatalog>,
    pub node_key: Arc<RwLock<Ed25519KeyPair>>,
    pub vm: Arc<Mutex<ContractVm>>,
    /// Serializes every writer: block commits, rollbacks, dissemination.
    pub db_lock: Arc<tokio::sync::Mutex<()>>,
    pub bans: Arc<BanService>,
    pub tx_bans: Arc<TxBanList>,
    pub bus: Arc<InMemoryEventBus>,
    pub engine: Arc<BlockEngine>,
    pub rollback: Arc<RollbackService>,
    pub transport: Arc<dyn PeerTransport>,
}

impl NodeContext {
    pub fn new(
        config: NodeConfig,
        node_key: Ed25519KeyPair,
        db: Database,
        transport: Arc<dyn PeerTransport>,
    ) -> Result<Self> {
        Self::new_with_clock(config, node_key, db, transport, Arc::new(SystemTimeSource))
    }

    pub fn new_with_clock(
        config: NodeConfig,
        node_key: Ed25519KeyPair,
        db: Database,
        transport: Arc<dyn PeerTransport>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        let params = Arc::new(SystemParameters::new(
            node_key.public_key().as_bytes().to_vec(),
            config.network.nodes_addr.clone(),
        ));
        let catalog = Arc::new(ColumnCatalog::new());
        db.read(|t| -> Result<()> {
            params.refresh(t)?;
            catalog.refresh(t);
            Ok(())
        })?;
        let restored = restore_first_block_data(&db, &params)?;

        let vm = Arc::new(Mutex::new(db.read(ContractVm::load)));
        let node_key = Arc::new(RwLock::new(node_key));
        let bus = Arc::new(InMemoryEventBus::new());
        let tx_bans = Arc::new(TxBanList::new(
            config.mempool.ban_threshold,
            config.mempool.ban_time(),
        ));

        let engine = BlockEngine::new(EngineDependencies {
            db: db.clone(),
            params: params.clone(),
            catalog: catalog.clone(),
            executor: Arc::new(Executor::new(params.clone(), catalog.clone())),
            vm: vm.clone(),
            node_key: node_key.clone(),
            bus: bus.clone(),
            tx_bans: tx_bans.clone(),
            config: config.engine.clone(),
        })
        .with_time_source(clock);

        let rollback = RollbackService::new(
            db.clone(),
            params.clone(),
            catalog.clone(),
            vm.clone(),
            bus.clone(),
        );

        info!(
            honor_nodes = params.number_of_nodes(),
            position = params.this_node_position().ok(),
            first_block = restored,
            "[node] context ready"
        );

        Ok(Self {
            bans: Arc::new(BanService::new(params.clone())),
            config,
            db,
            params,
            catalog,
            node_key,
            vm,
            db_lock: Arc::new(tokio::sync::Mutex::new(())),
            tx_bans,
            bus,
            engine: Arc::new(engine),
            rollback: Arc::new(rollback),
            transport,
        })
    }

    /// Id of the committed tip, 0 before genesis.
    pub fn tip_id(&self) -> i64 {
        self.db
            .read(|t| t.info_block().map(|info| info.block_id))
            .unwrap_or(0)
    }

    pub fn now(&self) -> i64 {
        self.engine.now()
    }

    /// Ban the producer at `position` when `err` says it misbehaved.
    pub fn report_bad_block(&self, position: i64, block_id: i64, err: &BlockError) {
        if !err.is_bannable() {
            return;
        }
        match self.params.node_by_position(position) {
            Ok(node) => {
                self.bans
                    .register_bad_block(&node.public_key, block_id, self.now(), &err.to_string());
            }
            Err(e) => warn!(position, block_id, error = %e, "[node] bad block from unknown position"),
        }
    }
}
