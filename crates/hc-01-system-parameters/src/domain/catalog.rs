//! Byte-column catalog.
//!
//! Contracts write every value as text. Columns of type `bytea` in
//! ecosystem tables need hex input, so the executor asks this catalog before
//! writing a row.

use hc_02_state_store::{ColumnType, Tables};
use parking_lot::RwLock;
use std::collections::HashSet;
use tracing::debug;

/// Cached `(table, column)` pairs of byte columns.
#[derive(Debug, Default)]
pub struct ColumnCatalog {
    byte_columns: RwLock<HashSet<(String, String)>>,
}

impl ColumnCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload from the store's column catalog. Only tables whose name carries
    /// a digit (ecosystem-prefixed tables) are considered.
    pub fn refresh(&self, tables: &Tables) {
        let loaded: HashSet<(String, String)> = tables
            .column_catalog()
            .into_iter()
            .filter(|(table, _, ty)| {
                *ty == ColumnType::Bytea && table.chars().any(|c| c.is_ascii_digit())
            })
            .map(|(table, column, _)| (table, column))
            .collect();
        debug!(columns = loaded.len(), "[hc-01] byte-column catalog reloaded");
        *self.byte_columns.write() = loaded;
    }

    pub fn is_byte_column(&self, table: &str, column: &str) -> bool {
        self.byte_columns
            .read()
            .contains(&(table.to_string(), column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.byte_columns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
