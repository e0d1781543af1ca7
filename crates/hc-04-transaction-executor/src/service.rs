//! # Executor Service
//!
//! Plays one transaction inside the caller's database transaction.
//!
//! ```text
//!   play(ctx, tx)
//!     ├── smart call:  deadline ─> resolve ─> access ─> fuel ─> contract
//!     └── otherwise:   custom handler by type byte
//!   catch_unwind around both: a panic becomes ExecError::Panic
//! ```
//!
//! Each call runs under its own `tx_<hash>` savepoint, which a failed play
//! rolls back before returning. The caller still owns the `mark_block_<i>`
//! savepoint around it and undoes [`PlayOutcome::flush`] on error.

use crate::context::{ExecContext, PlayContext};
use crate::contracts;
use crate::domain::fuel::{data_cost, FuelMeter};
use crate::domain::rand::tx_rand;
use crate::domain::transaction::{SmartCall, Transaction, TxBody};
use crate::domain::vm::FlushRecord;
use crate::error::{ExecError, Result, VmError};
use crate::handlers::{CustomHandler, FirstBlockHandler, StopNetworkHandler};
use hc_01_system_parameters::{ColumnCatalog, SystemParameters};
use hc_02_state_store::RollbackRecord;
use shared_types::Notification;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Effects of a successfully played transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEffects {
    pub message: String,
    /// Row pre-images, numbered from zero within the transaction.
    pub rollback: Vec<RollbackRecord>,
    pub sys_update: bool,
    pub touched_contracts: bool,
    pub notifications: Vec<Notification>,
    pub fuel_used: i64,
}

/// Result of [`Executor::play`]. `flush` is reported on success and failure.
#[derive(Debug)]
pub struct PlayOutcome {
    pub flush: Vec<FlushRecord>,
    pub sys_update: bool,
    pub result: Result<TxEffects>,
}

/// Transaction executor.
pub struct Executor {
    params: Arc<SystemParameters>,
    catalog: Arc<ColumnCatalog>,
    handlers: HashMap<u8, Arc<dyn CustomHandler>>,
}

impl Executor {
    /// An executor with the first-block and stop-network handlers.
    pub fn new(params: Arc<SystemParameters>, catalog: Arc<ColumnCatalog>) -> Self {
        let mut executor = Self {
            params,
            catalog,
            handlers: HashMap::new(),
        };
        executor.register_handler(Arc::new(FirstBlockHandler));
        executor.register_handler(Arc::new(StopNetworkHandler));
        executor
    }

    /// Register a handler, replacing any handler of the same type.
    pub fn register_handler(&mut self, handler: Arc<dyn CustomHandler>) {
        debug!(tx_type = handler.tx_type(), name = handler.name(), "[hc-04] handler registered");
        self.handlers.insert(handler.tx_type(), handler);
    }

    pub fn params(&self) -> &Arc<SystemParameters> {
        &self.params
    }

    pub fn catalog(&self) -> &Arc<ColumnCatalog> {
        &self.catalog
    }

    /// Play `tx` against `ctx.db` and `ctx.vm`.
    pub fn play(&self, ctx: &mut PlayContext<'_>, tx: &Transaction) -> PlayOutcome {
        let savepoint = format!("tx_{}", hex::encode(tx.hash));
        ctx.db.savepoint(&savepoint);

        let mut exec = ExecContext {
            db: &mut *ctx.db,
            vm: &mut *ctx.vm,
            params: &self.params,
            catalog: &self.catalog,
            block: ctx.block,
            tx_hash: tx.hash,
            key_id: tx.key_id(),
            ecosystem_id: tx.ecosystem_id(),
            rand: tx_rand(ctx.block.block_time, &tx.hash),
            fuel: FuelMeter::new(self.params.max_cost()),
            rollback: Vec::new(),
            flush: Vec::new(),
            sys_update: false,
            touched_contracts: false,
            notifications: Vec::new(),
        };

        let played = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&mut exec, tx)));
        let message = played.unwrap_or_else(|payload| Err(ExecError::Panic(panic_message(payload))));

        let flush = std::mem::take(&mut exec.flush);
        let sys_update = exec.sys_update;
        let mut result = message.map(|message| TxEffects {
            message,
            rollback: std::mem::take(&mut exec.rollback),
            sys_update,
            touched_contracts: exec.touched_contracts,
            notifications: std::mem::take(&mut exec.notifications),
            fuel_used: exec.fuel.used(),
        });

        if result.is_err() {
            if let Err(e) = ctx.db.rollback_to_savepoint(&savepoint) {
                result = Err(e.into());
            }
        }
        if let Err(e) = ctx.db.release_savepoint(&savepoint) {
            result = Err(e.into());
        }
        PlayOutcome {
            flush,
            sys_update,
            result,
        }
    }

    fn dispatch(&self, ctx: &mut ExecContext<'_>, tx: &Transaction) -> Result<String> {
        match &tx.body {
            TxBody::Smart(call) => self.play_smart(ctx, tx, call),
            _ => {
                let handler = self
                    .handlers
                    .get(&tx.tx_type())
                    .ok_or(ExecError::UnknownType(tx.tx_type()))?;
                handler.play(ctx, tx)
            }
        }
    }

    fn play_smart(&self, ctx: &mut ExecContext<'_>, tx: &Transaction, call: &SmartCall) -> Result<String> {
        ctx.check_deadline()?;
        let entry = ctx
            .vm
            .get(&call.contract)
            .cloned()
            .ok_or_else(|| VmError::UnknownContract(call.contract.clone()))?;

        if let Some(allowed) = self.params.access_exec(&entry.name) {
            if allowed != ctx.key_id.to_string() {
                return Err(ExecError::AccessDenied {
                    contract: entry.name,
                    key_id: ctx.key_id,
                });
            }
        }

        let price = self
            .params
            .price_exec(&entry.name)
            .unwrap_or_else(|| contracts::default_price(&entry));
        ctx.fuel
            .charge(price.saturating_add(data_cost(tx.size(), self.params.price_tx_data())))?;

        let message = contracts::dispatch(ctx, &entry, &call.params)?;
        ctx.check_deadline()?;
        Ok(message)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic".into()
}
