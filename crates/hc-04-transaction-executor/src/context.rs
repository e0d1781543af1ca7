//! # Execution Context
//!
//! [`PlayContext`] is what the block engine lends the executor for one
//! transaction. [`ExecContext`] is the transaction-scoped view contracts and
//! handlers write through: every row write records its pre-image as a
//! rollback row, every VM registration records a flush record.

use crate::domain::fuel::FuelMeter;
use crate::domain::vm::{ContractEntry, ContractVm, FlushRecord};
use crate::error::{ExecError, Result, VmError};
use hc_01_system_parameters::{ColumnCatalog, SystemParameters};
use hc_02_state_store::{DbError, DbTransaction, RollbackRecord, Row};
use rand_chacha::ChaCha20Rng;
use shared_types::{Hash, Notification};
use std::time::{Duration, Instant};

/// Pseudo-table name of rollback rows for `system_parameters`.
pub const SYSTEM_PARAMETERS_TABLE: &str = "system_parameters";

/// Block generation wall-clock budget.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub started: Instant,
    pub max: Duration,
}

impl Deadline {
    pub fn starting_now(max: Duration) -> Self {
        Self {
            started: Instant::now(),
            max,
        }
    }

    pub fn check(&self) -> std::result::Result<(), VmError> {
        let elapsed = self.started.elapsed();
        if elapsed > self.max {
            return Err(VmError::TimeLimit {
                elapsed_ms: elapsed.as_millis() as u64,
                max_ms: self.max.as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// The block a transaction is played in.
#[derive(Debug, Clone, Copy)]
pub struct BlockScope {
    pub block_id: i64,
    pub block_time: i64,
    /// Only set while generating.
    pub deadline: Option<Deadline>,
}

/// What the engine lends the executor for one transaction.
pub struct PlayContext<'a> {
    pub db: &'a mut DbTransaction,
    pub vm: &'a mut ContractVm,
    pub block: BlockScope,
}

/// Transaction-scoped context seen by contracts and custom handlers.
pub struct ExecContext<'a> {
    pub db: &'a mut DbTransaction,
    pub vm: &'a mut ContractVm,
    pub params: &'a SystemParameters,
    pub catalog: &'a ColumnCatalog,
    pub block: BlockScope,
    pub tx_hash: Hash,
    pub key_id: i64,
    pub ecosystem_id: i64,
    pub rand: ChaCha20Rng,
    pub fuel: FuelMeter,
    pub(crate) rollback: Vec<RollbackRecord>,
    pub(crate) flush: Vec<FlushRecord>,
    pub(crate) sys_update: bool,
    pub(crate) touched_contracts: bool,
    pub(crate) notifications: Vec<Notification>,
}

impl<'a> ExecContext<'a> {
    pub fn check_deadline(&self) -> Result<()> {
        if let Some(deadline) = &self.block.deadline {
            deadline.check()?;
        }
        Ok(())
    }

    fn check_byte_columns(&self, table: &str, row: &Row) -> Result<()> {
        for (column, value) in row {
            if self.catalog.is_byte_column(table, column) && hex::decode(value).is_err() {
                return Err(ExecError::InvalidByteColumn {
                    table: table.to_string(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    fn record(&mut self, table: &str, id: &str, previous: Option<Row>) {
        self.rollback.push(RollbackRecord {
            block_id: self.block.block_id,
            tx_hash: self.tx_hash,
            seq: self.rollback.len() as u32,
            table_name: table.to_string(),
            table_id: id.to_string(),
            data: previous,
        });
    }

    /// Upsert a row, recording its pre-image.
    pub fn put_row(&mut self, table: &str, id: &str, row: Row) -> Result<()> {
        self.check_byte_columns(table, &row)?;
        let previous = self.db.put_row(table, id, row)?;
        self.record(table, id, previous);
        Ok(())
    }

    /// Insert with the next id, recording that the row did not exist.
    pub fn insert_row(&mut self, table: &str, row: Row) -> Result<String> {
        self.check_byte_columns(table, &row)?;
        let id = self.db.insert_row(table, row)?;
        self.record(table, &id, None);
        Ok(id)
    }

    /// Change a system parameter and flag the block for a cache refresh.
    pub fn set_param(&mut self, name: &str, value: &str) {
        let previous = self
            .db
            .set_system_parameter(name, value)
            .map(|v| Row::from([("value".to_string(), v)]));
        self.record(SYSTEM_PARAMETERS_TABLE, name, previous);
        self.sys_update = true;
    }

    /// Register a contract in the VM.
    pub fn register(&mut self, entry: ContractEntry) {
        let record = self.vm.register(entry);
        self.flush.push(record);
        self.touched_contracts = true;
    }

    pub fn mark_sys_update(&mut self) {
        self.sys_update = true;
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

/// Undo one rollback row: restore or delete the row it describes.
pub fn undo_rollback_record(
    db: &mut DbTransaction,
    record: &RollbackRecord,
) -> std::result::Result<(), DbError> {
    if record.table_name == SYSTEM_PARAMETERS_TABLE {
        match record.data.as_ref().and_then(|row| row.get("value")) {
            Some(value) => {
                db.set_system_parameter(&record.table_id, value);
            }
            None => {
                db.delete_system_parameter(&record.table_id);
            }
        }
        return Ok(());
    }
    db.restore_row(&record.table_name, &record.table_id, record.data.clone())
}
