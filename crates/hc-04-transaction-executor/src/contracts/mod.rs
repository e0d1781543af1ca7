//! # Contracts
//!
//! Four built-ins are always registered; everything created through
//! `NewContract` is a stored contract whose calls persist their parameters
//! under `1_contract_data`.
//!
//! | Contract | Params | Effect |
//! |----------|--------|--------|
//! | `MoneyTransfer` | `recipient`, `amount` | move funds in `{eco}_keys` |
//! | `NewContract` | `name`, `value` | store and register a contract |
//! | `EditContract` | `name`, `value` | replace an owned stored contract |
//! | `UpdateSysParam` | `name`, `value` | founder-only parameter change |

mod builtin;
mod stored;

use crate::context::ExecContext;
use crate::domain::vm::{ContractEntry, ContractKind};
use crate::error::{Result, VmError};
use std::collections::BTreeMap;

pub const MONEY_TRANSFER: &str = "MoneyTransfer";
pub const NEW_CONTRACT: &str = "NewContract";
pub const EDIT_CONTRACT: &str = "EditContract";
pub const UPDATE_SYS_PARAM: &str = "UpdateSysParam";

/// Contracts registered in every VM, in slot order.
pub const BUILTIN_CONTRACTS: &[&str] = &[MONEY_TRANSFER, NEW_CONTRACT, EDIT_CONTRACT, UPDATE_SYS_PARAM];

/// Fuel charged for a call when no `price_exec_<name>` is configured.
pub fn default_price(entry: &ContractEntry) -> i64 {
    match (&entry.kind, entry.name.as_str()) {
        (ContractKind::Builtin, MONEY_TRANSFER) => 1_000,
        (ContractKind::Builtin, NEW_CONTRACT) => 50_000,
        (ContractKind::Builtin, EDIT_CONTRACT) => 30_000,
        (ContractKind::Builtin, UPDATE_SYS_PARAM) => 10_000,
        (ContractKind::Builtin, _) => 1_000,
        (ContractKind::Stored { .. }, _) => 5_000,
    }
}

/// Run a resolved contract. Returns the user-visible result message.
pub fn dispatch(
    ctx: &mut ExecContext<'_>,
    entry: &ContractEntry,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    match (&entry.kind, entry.name.as_str()) {
        (ContractKind::Builtin, MONEY_TRANSFER) => builtin::money_transfer(ctx, params),
        (ContractKind::Builtin, NEW_CONTRACT) => builtin::new_contract(ctx, params),
        (ContractKind::Builtin, EDIT_CONTRACT) => builtin::edit_contract(ctx, params),
        (ContractKind::Builtin, UPDATE_SYS_PARAM) => builtin::update_sys_param(ctx, params),
        (ContractKind::Builtin, other) => Err(VmError::UnknownContract(other.to_string()).into()),
        (ContractKind::Stored { .. }, _) => stored::call(ctx, entry, params),
    }
}

fn param<'p>(params: &'p BTreeMap<String, String>, name: &str) -> Result<&'p str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| invalid(name, "missing"))
}

fn invalid(name: &str, reason: &str) -> crate::error::ExecError {
    VmError::InvalidParam {
        name: name.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
