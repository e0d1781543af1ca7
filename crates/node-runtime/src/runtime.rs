//! # Node Runtime
//!
//! Start-up order:
//!
//! 1. Data-dir lock, then the state store
//! 2. Node context (parameters, VM, engine, rollback)
//! 3. Genesis load when the chain is empty
//! 4. Peer server
//! 5. Supervised daemons
//!
//! Shutdown is one `watch` flag seen by the server and every daemon. A
//! played stop-network transaction raises it as well.

use crate::config::{NodeConfig, StoreLocation};
use crate::context::NodeContext;
use crate::daemons::register_daemons;
use crate::error::Result;
use crate::genesis::initial_load;
use crate::keys::NodeKeys;
use crate::server::PeerServer;
use hc_02_state_store::{Database, DatabaseLock, FileSnapshotStore};
use hc_07_dissemination::TcpTransport;
use hc_08_daemons::{DaemonExit, DbProbe, Supervisor};
use shared_bus::{EventFilter, EventTopic, NodeEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Open the configured store, locking its directory first.
pub fn open_database(config: &NodeConfig) -> Result<(Database, Option<DatabaseLock>)> {
    match config.database.location(&config.directories.data_dir)? {
        StoreLocation::Memory => Ok((Database::in_memory(), None)),
        StoreLocation::Directory(dir) => {
            let lock = DatabaseLock::acquire(&dir, config.database.lock_timeout())?;
            let db = Database::open(Arc::new(FileSnapshotStore::new(&dir)))?;
            Ok((db, Some(lock)))
        }
    }
}

pub struct NodeRuntime {
    ctx: Arc<NodeContext>,
    shutdown: Arc<watch::Sender<bool>>,
    // held for the life of the process
    _lock: Option<DatabaseLock>,
}

/// Handles of a started node.
pub struct RunningNode {
    pub peer_addr: SocketAddr,
    pub exits: mpsc::Receiver<DaemonExit>,
    server: JoinHandle<()>,
}

impl NodeRuntime {
    /// Load keys and state for `config`.
    pub fn open(config: NodeConfig) -> Result<Self> {
        let keys = NodeKeys::load(&config.directories.keys_dir)?;
        info!(key_id = keys.key_id(), "[node] node key loaded");
        let (db, lock) = open_database(&config)?;
        let transport = Arc::new(TcpTransport::new(config.transport.clone()));
        let ctx = NodeContext::new(config, keys.into_key_pair(), db, transport)?;
        Ok(Self::with_context(Arc::new(ctx), lock))
    }

    pub fn with_context(ctx: Arc<NodeContext>, lock: Option<DatabaseLock>) -> Self {
        Self {
            ctx,
            shutdown: Arc::new(watch::channel(false).0),
            _lock: lock,
        }
    }

    pub fn context(&self) -> &Arc<NodeContext> {
        &self.ctx
    }

    pub fn shutdown_handle(&self) -> Arc<watch::Sender<bool>> {
        self.shutdown.clone()
    }

    pub async fn start(&self) -> Result<RunningNode> {
        let ctx = &self.ctx;
        initial_load(ctx).await?;

        let listener = PeerServer::bind(&ctx.config.network.tcp_addr).await?;
        let peer_addr = listener.local_addr()?;
        let server = tokio::spawn(PeerServer::new(ctx.clone()).run(listener, self.shutdown.subscribe()));

        self.watch_network_stop();

        let registry = Arc::new(register_daemons(ctx));
        let names = if ctx.config.daemons.names.is_empty() {
            registry.select(ctx.config.daemons.test_rollback)
        } else {
            ctx.config.daemons.names.clone()
        };
        let probe: Arc<dyn DbProbe> = Arc::new(ctx.db.clone());
        let supervisor = Supervisor::new(registry, probe, ctx.config.daemons.supervisor.clone());
        let exits = supervisor.start(self.shutdown.clone(), &names);

        hc_telemetry::log_event!(
            info,
            "node",
            "[node] 🚀 node started",
            %peer_addr,
            tip = ctx.tip_id(),
            daemons = ?names
        );
        Ok(RunningNode {
            peer_addr,
            exits,
            server,
        })
    }

    /// Raise shutdown once a stop-network transaction is committed.
    fn watch_network_stop(&self) {
        let mut events = self
            .ctx
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Lifecycle]));
        let shutdown = self.shutdown.clone();
        let mut stopped = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(NodeEvent::NetworkStopping { block_id }) => {
                            warn!(block_id, "[node] 🛑 network stop committed");
                            shutdown.send_replace(true);
                            return;
                        }
                        Some(_) => {}
                        None => return,
                    },
                    _ = stopped.changed() => return,
                }
            }
        });
    }

    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait for every daemon to report back, then for the server.
    pub async fn wait(&self, running: RunningNode) {
        let RunningNode {
            mut exits, server, ..
        } = running;
        while let Some(exit) = exits.recv().await {
            match exit.result {
                Ok(()) => info!(daemon = exit.name, "[node] daemon stopped"),
                Err(e) => error!(daemon = exit.name, error = %e, "[node] daemon failed"),
            }
        }
        if let Err(e) = server.await {
            error!(error = %e, "[node] peer server task failed");
        }
        self.ctx.db.close();
        info!("[node] 👋 node stopped");
    }
}
