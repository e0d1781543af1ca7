//! # Transaction Executor (hc-04)
//!
//! Parses, verifies and plays transactions against an open database
//! transaction. Contract registrations live in the in-memory [`ContractVm`]
//! and are reported back as [`FlushRecord`]s so a failed transaction can be
//! taken out of the VM as well as the database.
//!
//! ## Crate Structure
//!
//! - `domain/` - transactions, VM registries, fuel, PRNG, sender bans
//! - `context.rs` - what contracts and handlers write through
//! - `contracts/` - built-in and stored contracts
//! - `handlers/` - first-block and stop-network transaction types
//! - `service.rs` - [`Executor::play`]

pub mod context;
pub mod contracts;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod service;

pub use context::{
    undo_rollback_record, BlockScope, Deadline, ExecContext, PlayContext, SYSTEM_PARAMETERS_TABLE,
};
pub use contracts::BUILTIN_CONTRACTS;
pub use domain::ban::TxBanList;
pub use domain::fuel::{data_cost, FuelMeter};
pub use domain::rand::tx_rand;
pub use domain::transaction::{
    first_block, smart_call, stop_network, FirstBlockTx, SmartCall, StopNetworkTx, Transaction,
    TxBody, TxHeader, MAX_TX_BACK, MAX_TX_FORWARD, TX_TYPE_FIRST_BLOCK, TX_TYPE_SMART,
    TX_TYPE_STOP_NETWORK,
};
pub use domain::vm::{undo_all, ContractEntry, ContractKind, ContractVm, FlushMismatch, FlushRecord};
pub use error::{ExecError, Result, VmError};
pub use handlers::{CustomHandler, FirstBlockHandler, StopNetworkHandler};
pub use service::{Executor, PlayOutcome, TxEffects};
