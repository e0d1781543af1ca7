//! Built-in contracts.

use super::{invalid, param};
use crate::context::ExecContext;
use crate::domain::vm::{ContractEntry, ContractKind, CONTRACTS_TABLE};
use crate::error::{ExecError, Result, VmError};
use hc_01_system_parameters::{names, parse_ecosystem_pairs, HonorNodeSet};
use hc_02_state_store::{DbError, Row};
use shared_types::{Notification, NotificationKind};
use std::collections::BTreeMap;

fn balance(row: &Row) -> i128 {
    row.get("amount")
        .and_then(|a| a.parse().ok())
        .unwrap_or(0)
}

fn new_account() -> Row {
    Row::from([
        ("pub".to_string(), String::new()),
        ("amount".to_string(), "0".to_string()),
        ("deleted".to_string(), "0".to_string()),
        ("blocked".to_string(), "0".to_string()),
    ])
}

pub(super) fn money_transfer(
    ctx: &mut ExecContext<'_>,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    let recipient: i64 = param(params, "recipient")?
        .parse()
        .map_err(|_| invalid("recipient", "not an account id"))?;
    let amount: i128 = param(params, "amount")?
        .parse()
        .map_err(|_| invalid("amount", "not a number"))?;
    if amount <= 0 {
        return Err(invalid("amount", "must be positive"));
    }
    if recipient == ctx.key_id {
        return Err(invalid("recipient", "same as sender"));
    }

    let table = format!("{}_keys", ctx.ecosystem_id);
    if !ctx.db.table_exists(&table) {
        return Err(DbError::TableNotFound(table).into());
    }

    let sender_id = ctx.key_id.to_string();
    let mut sender = ctx
        .db
        .row(&table, &sender_id)
        .cloned()
        .ok_or(VmError::AccountNotFound(ctx.key_id))?;
    let available = balance(&sender);
    if available < amount {
        return Err(VmError::InsufficientFunds {
            key_id: ctx.key_id,
            needed: amount,
            available,
        }
        .into());
    }
    sender.insert("amount".into(), (available - amount).to_string());
    ctx.put_row(&table, &sender_id, sender)?;

    let recipient_id = recipient.to_string();
    let mut target = ctx
        .db
        .row(&table, &recipient_id)
        .cloned()
        .unwrap_or_else(new_account);
    let credited = balance(&target) + amount;
    target.insert("amount".into(), credited.to_string());
    ctx.put_row(&table, &recipient_id, target)?;

    ctx.notify(Notification {
        ecosystem_id: ctx.ecosystem_id,
        kind: NotificationKind::Account,
        recipient,
        payload: format!("received {amount} from {}", ctx.key_id),
    });
    Ok(amount.to_string())
}

fn contract_name(params: &BTreeMap<String, String>) -> Result<String> {
    let name = param(params, "name")?;
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("name", "only letters, digits and '_' are allowed"));
    }
    Ok(name.to_string())
}

fn contract_row(name: &str, source: &str, wallet_id: i64) -> Row {
    Row::from([
        ("name".to_string(), name.to_string()),
        ("value".to_string(), source.to_string()),
        ("wallet_id".to_string(), wallet_id.to_string()),
        ("active".to_string(), "1".to_string()),
    ])
}

pub(super) fn new_contract(
    ctx: &mut ExecContext<'_>,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    let name = contract_name(params)?;
    let source = param(params, "value")?.to_string();
    if ctx.vm.contains(&name) {
        return Err(VmError::ContractExists(name).into());
    }
    let row_id = ctx.insert_row(CONTRACTS_TABLE, contract_row(&name, &source, ctx.key_id))?;
    ctx.register(ContractEntry {
        name,
        kind: ContractKind::Stored {
            row_id: row_id.clone(),
        },
        wallet_id: ctx.key_id,
        source,
    });
    Ok(row_id)
}

pub(super) fn edit_contract(
    ctx: &mut ExecContext<'_>,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    let name = contract_name(params)?;
    let source = param(params, "value")?.to_string();
    let entry = ctx
        .vm
        .get(&name)
        .cloned()
        .ok_or_else(|| VmError::UnknownContract(name.clone()))?;
    let ContractKind::Stored { row_id } = &entry.kind else {
        return Err(VmError::NotEditable(name).into());
    };
    if entry.wallet_id != ctx.key_id {
        return Err(ExecError::AccessDenied {
            contract: name,
            key_id: ctx.key_id,
        });
    }
    ctx.put_row(CONTRACTS_TABLE, row_id, contract_row(&name, &source, entry.wallet_id))?;
    let row_id = row_id.clone();
    ctx.register(ContractEntry {
        source,
        ..entry
    });
    Ok(row_id)
}

pub(super) fn update_sys_param(
    ctx: &mut ExecContext<'_>,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    let founder = ctx.params.first_block_data()?.key_id;
    if ctx.key_id != founder {
        return Err(ExecError::NotFounder);
    }
    let name = param(params, "name")?.to_string();
    let value = params.get("value").cloned().unwrap_or_default();
    // the cache must be able to reparse whatever lands in the table
    match name.as_str() {
        names::HONOR_NODES => {
            HonorNodeSet::parse(&value)?;
        }
        names::FUEL_RATE | names::TAXES_WALLET => {
            parse_ecosystem_pairs(&name, &value)?;
        }
        _ => {}
    }
    ctx.set_param(&name, &value);
    Ok(name)
}
