//! # Contract VM Registries
//!
//! `children` is the ordered list of contracts known to the VM; `objects`
//! maps a name to its slot. Both live outside the database, so a rolled back
//! transaction must also undo its registrations. Every registration is
//! captured as a [`FlushRecord`] holding the pre-image of the slot.
//!
//! ```text
//!   register(entry) ──> FlushRecord { id, prev: None }        appended slot
//!   replace(entry)  ──> FlushRecord { id, prev: Some(old) }   replaced slot
//!
//!   undo (reverse order):
//!     prev == None  -> pop the trailing slot (only if it is the last one)
//!     prev == Some  -> restore the previous entry and object info
//! ```

use crate::contracts::BUILTIN_CONTRACTS;
use hc_02_state_store::Tables;
use std::collections::HashMap;
use tracing::warn;

/// Table holding stored contracts.
pub const CONTRACTS_TABLE: &str = "1_contracts";

/// How a contract is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractKind {
    /// Implemented natively by the executor.
    Builtin,
    /// Created on chain by `NewContract`; its row id in `1_contracts`.
    Stored { row_id: String },
}

/// One slot of the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEntry {
    pub name: String,
    pub kind: ContractKind,
    /// Owner account.
    pub wallet_id: i64,
    pub source: String,
}

impl ContractEntry {
    pub fn builtin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ContractKind::Builtin,
            wallet_id: 0,
            source: String::new(),
        }
    }
}

/// Where a name lives in `children`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjInfo {
    pub id: usize,
}

/// Pre-image of one registration, undone in reverse order on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushRecord {
    id: usize,
    name: String,
    prev: Option<ContractEntry>,
    prev_obj: Option<ObjInfo>,
    next: ContractEntry,
}

/// A flush record that no longer matches the VM it is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushMismatch {
    pub id: usize,
    pub children: usize,
}

impl FlushRecord {
    /// Re-apply the registration.
    pub fn apply(&self, vm: &mut ContractVm) {
        if self.id < vm.children.len() {
            vm.children[self.id] = self.next.clone();
        } else {
            vm.children.push(self.next.clone());
        }
        vm.objects
            .insert(self.name.clone(), ObjInfo { id: self.id });
    }

    /// Undo the registration.
    pub fn undo(&self, vm: &mut ContractVm) -> Result<(), FlushMismatch> {
        match &self.prev {
            None => {
                if vm.children.len() != self.id + 1 {
                    return Err(FlushMismatch {
                        id: self.id,
                        children: vm.children.len(),
                    });
                }
                vm.children.pop();
                vm.objects.remove(&self.name);
            }
            Some(prev) => {
                if let Some(slot) = vm.children.get_mut(self.id) {
                    *slot = prev.clone();
                }
                match self.prev_obj {
                    Some(info) => vm.objects.insert(self.name.clone(), info),
                    None => vm.objects.remove(&self.name),
                };
            }
        }
        Ok(())
    }
}

/// Undo a list of records newest first. Mismatches are logged and skipped.
pub fn undo_all(vm: &mut ContractVm, records: &[FlushRecord]) -> usize {
    let mut mismatches = 0;
    for record in records.iter().rev() {
        if let Err(m) = record.undo(vm) {
            mismatches += 1;
            warn!(
                id = m.id,
                children = m.children,
                "[hc-04] flush record does not match the trailing VM slot"
            );
        }
    }
    mismatches
}

/// Contract registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractVm {
    children: Vec<ContractEntry>,
    objects: HashMap<String, ObjInfo>,
}

impl Default for ContractVm {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractVm {
    /// A VM holding only the built-in contracts.
    pub fn new() -> Self {
        let mut vm = Self {
            children: Vec::new(),
            objects: HashMap::new(),
        };
        for name in BUILTIN_CONTRACTS {
            vm.register(ContractEntry::builtin(name));
        }
        vm
    }

    /// Built-ins plus every active stored contract, in row-id order.
    pub fn load(tables: &Tables) -> Self {
        let mut vm = Self::new();
        let Some(table) = tables.table(CONTRACTS_TABLE) else {
            return vm;
        };
        let mut rows: Vec<(&String, &hc_02_state_store::Row)> = table.rows.iter().collect();
        rows.sort_by_key(|(id, _)| id.parse::<i64>().unwrap_or(i64::MAX));
        for (id, row) in rows {
            if row.get("active").map(String::as_str) == Some("0") {
                continue;
            }
            let Some(name) = row.get("name") else { continue };
            vm.register(ContractEntry {
                name: name.clone(),
                kind: ContractKind::Stored { row_id: id.clone() },
                wallet_id: row.get("wallet_id").and_then(|w| w.parse().ok()).unwrap_or(0),
                source: row.get("value").cloned().unwrap_or_default(),
            });
        }
        vm
    }

    pub fn get(&self, name: &str) -> Option<&ContractEntry> {
        self.objects.get(name).and_then(|o| self.children.get(o.id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Register `entry`, replacing a slot of the same name or appending.
    pub fn register(&mut self, entry: ContractEntry) -> FlushRecord {
        let prev_obj = self.objects.get(&entry.name).copied();
        let (id, prev) = match prev_obj {
            Some(info) => (info.id, self.children.get(info.id).cloned()),
            None => (self.children.len(), None),
        };
        let record = FlushRecord {
            id,
            name: entry.name.clone(),
            prev,
            prev_obj,
            next: entry,
        };
        record.apply(self);
        record
    }
}
