use super::DISSEMINATOR;
use crate::context::NodeContext;
use async_trait::async_trait;
use hc_07_dissemination::{Dissemination, Disseminator};
use hc_08_daemons::{Daemon, DaemonContext, DaemonError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Runs [`Disseminator`] against the node clock.
pub struct DisseminatorDaemon {
    ctx: Arc<NodeContext>,
    inner: Disseminator,
}

impl DisseminatorDaemon {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        let inner = Disseminator::new(
            ctx.db.clone(),
            ctx.params.clone(),
            ctx.bans.clone(),
            ctx.transport.clone(),
            ctx.db_lock.clone(),
        );
        Self { ctx, inner }
    }
}

#[async_trait]
impl Daemon for DisseminatorDaemon {
    fn name(&self) -> &'static str {
        DISSEMINATOR
    }

    fn sleep_time(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn run(&self, _ctx: &DaemonContext) -> Result<()> {
        match self.inner.run_once_at(self.ctx.now()).await {
            Ok(Dissemination::Sent {
                block_id,
                txs,
                hosts,
                failed,
            }) => {
                debug!(?block_id, txs, hosts, failed, "[node] disseminated");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => Err(DaemonError::handler(DISSEMINATOR, e)),
        }
    }
}
