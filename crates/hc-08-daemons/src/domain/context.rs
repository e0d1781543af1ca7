//! Per-loop handle given to a daemon on every iteration.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct DaemonContext {
    name: &'static str,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl DaemonContext {
    pub fn new(name: &'static str, shutdown: Arc<watch::Sender<bool>>) -> Self {
        Self {
            name,
            shutdown_rx: shutdown.subscribe(),
            shutdown_tx: shutdown,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Stop the whole node, e.g. after a stop-network transaction.
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.shutdown_rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
