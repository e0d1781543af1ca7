//! Custom transaction handlers.
//!
//! Non-contract transaction types are played by a handler registered under
//! their type byte.

mod first_block;
mod stop_network;

pub use first_block::FirstBlockHandler;
pub use stop_network::StopNetworkHandler;

use crate::context::ExecContext;
use crate::domain::transaction::Transaction;
use crate::error::Result;

/// Plays one non-contract transaction type.
pub trait CustomHandler: Send + Sync {
    fn tx_type(&self) -> u8;

    fn name(&self) -> &'static str;

    /// Apply the transaction. Returns the user-visible result message.
    fn play(&self, ctx: &mut ExecContext<'_>, tx: &Transaction) -> Result<String>;
}
