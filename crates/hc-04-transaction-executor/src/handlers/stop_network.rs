use super::CustomHandler;
use crate::context::ExecContext;
use crate::domain::transaction::{Transaction, TX_TYPE_STOP_NETWORK};
use crate::error::{ExecError, Result};
use tracing::warn;

/// Founder-only network stop. Success is reported as
/// [`ExecError::NetworkStopping`] so the engine can begin an orderly shutdown.
#[derive(Debug, Default)]
pub struct StopNetworkHandler;

impl CustomHandler for StopNetworkHandler {
    fn tx_type(&self) -> u8 {
        TX_TYPE_STOP_NETWORK
    }

    fn name(&self) -> &'static str {
        "StopNetwork"
    }

    fn play(&self, ctx: &mut ExecContext<'_>, tx: &Transaction) -> Result<String> {
        let founder = ctx.params.first_block_data()?.key_id;
        if tx.key_id() != founder {
            return Err(ExecError::NotFounder);
        }
        warn!(block_id = ctx.block.block_id, "[hc-04] 🛑 stop network requested");
        Err(ExecError::NetworkStopping)
    }
}
