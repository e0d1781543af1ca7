//! Stored contracts.
//!
//! A call persists each parameter as `1_contract_data[<contract>.<key>]` plus
//! one `_rand` draw from the transaction PRNG, so every node replaying the
//! block ends with identical rows.

use crate::context::ExecContext;
use crate::domain::vm::ContractEntry;
use crate::error::Result;
use hc_02_state_store::Row;
use rand::RngCore;
use std::collections::BTreeMap;

pub const CONTRACT_DATA_TABLE: &str = "1_contract_data";
const RAND_KEY: &str = "_rand";

fn data_row(contract: &str, key: &str, value: &str) -> Row {
    Row::from([
        ("contract".to_string(), contract.to_string()),
        ("key".to_string(), key.to_string()),
        ("value".to_string(), value.to_string()),
    ])
}

pub(super) fn call(
    ctx: &mut ExecContext<'_>,
    entry: &ContractEntry,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    for (key, value) in params {
        ctx.check_deadline()?;
        let id = format!("{}.{}", entry.name, key);
        ctx.put_row(CONTRACT_DATA_TABLE, &id, data_row(&entry.name, key, value))?;
    }
    let drawn = ctx.rand.next_u64().to_string();
    let id = format!("{}.{}", entry.name, RAND_KEY);
    ctx.put_row(CONTRACT_DATA_TABLE, &id, data_row(&entry.name, RAND_KEY, &drawn))?;
    Ok(drawn)
}
