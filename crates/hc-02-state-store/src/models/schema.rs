//! Schema installation and `migration_history`.

use crate::domain::rows::{ColumnType, MigrationRecord, Row};
use crate::domain::tables::Tables;
use crate::error::Result;
use crate::service::DbTransaction;
use std::sync::Arc;

/// Version recorded once the system tables exist.
pub const SCHEMA_VERSION: &str = "1.0.0";

const SYSTEM_TABLES: &[(&str, &[(&str, ColumnType)])] = &[
    (
        "1_keys",
        &[
            ("pub", ColumnType::Bytea),
            ("amount", ColumnType::Money),
            ("deleted", ColumnType::BigInt),
            ("blocked", ColumnType::BigInt),
        ],
    ),
    (
        "1_tables",
        &[("name", ColumnType::Text), ("columns", ColumnType::Json)],
    ),
    (
        "1_contracts",
        &[
            ("name", ColumnType::Text),
            ("value", ColumnType::Text),
            ("wallet_id", ColumnType::BigInt),
            ("active", ColumnType::BigInt),
        ],
    ),
    (
        "1_contract_data",
        &[
            ("contract", ColumnType::Text),
            ("key", ColumnType::Text),
            ("value", ColumnType::Text),
        ],
    ),
    (
        "1_ecosystems",
        &[("name", ColumnType::Text), ("info", ColumnType::Json)],
    ),
];

impl Tables {
    pub fn migrations(&self) -> &[MigrationRecord] {
        &self.migration_history
    }

    pub fn has_migration(&self, version: &str) -> bool {
        self.migration_history.iter().any(|m| m.version == version)
    }
}

impl DbTransaction {
    pub fn record_migration(&mut self, version: &str, applied_at: i64) {
        Arc::make_mut(&mut self.tables_mut().migration_history).push(MigrationRecord {
            version: version.to_string(),
            applied_at,
        });
    }
}

/// Create the ecosystem-1 tables once. Returns false if already installed.
pub fn install_schema(tx: &mut DbTransaction, applied_at: i64) -> Result<bool> {
    if tx.has_migration(SCHEMA_VERSION) {
        return Ok(false);
    }
    for (name, columns) in SYSTEM_TABLES {
        tx.create_table(name, columns)?;
    }
    for (name, columns) in SYSTEM_TABLES {
        let described: serde_json::Map<String, serde_json::Value> = columns
            .iter()
            .map(|(col, ty)| (col.to_string(), serde_json::Value::from(ty.as_str())))
            .collect();
        let mut row = Row::new();
        row.insert("name".into(), name.to_string());
        row.insert(
            "columns".into(),
            serde_json::Value::Object(described).to_string(),
        );
        tx.insert_row("1_tables", row)?;
    }
    let mut eco = Row::new();
    eco.insert("name".into(), "platform ecosystem".into());
    eco.insert("info".into(), "{}".into());
    tx.put_row("1_ecosystems", "1", eco)?;
    tx.record_migration(SCHEMA_VERSION, applied_at);
    tracing::info!("[hc-02] schema {} installed", SCHEMA_VERSION);
    Ok(true)
}
