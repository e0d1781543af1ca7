//! Generic ecosystem tables (`1_keys`, `1_contracts`, ...) and their column
//! catalog.

use crate::domain::rows::{ColumnType, Row};
use crate::domain::tables::{DataTable, Tables};
use crate::error::{DbError, Result};
use crate::service::DbTransaction;
use std::collections::BTreeMap;
use std::sync::Arc;

impl Tables {
    pub fn table_exists(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn table(&self, name: &str) -> Option<&DataTable> {
        self.data.get(name).map(Arc::as_ref)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    pub fn row(&self, table: &str, id: &str) -> Option<&Row> {
        self.data.get(table).and_then(|t| t.rows.get(id))
    }

    /// Row count, zero for a missing table.
    pub fn row_count(&self, table: &str) -> usize {
        self.data.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn column_type(&self, table: &str, column: &str) -> Option<ColumnType> {
        self.data.get(table).and_then(|t| t.columns.get(column).copied())
    }

    /// Every `(table, column, type)` triple, the information-schema view.
    pub fn column_catalog(&self) -> Vec<(String, String, ColumnType)> {
        self.data
            .iter()
            .flat_map(|(name, table)| {
                table
                    .columns
                    .iter()
                    .map(move |(col, ty)| (name.clone(), col.clone(), *ty))
            })
            .collect()
    }
}

impl DbTransaction {
    fn data_table_mut(&mut self, name: &str) -> Result<&mut DataTable> {
        let tables = Arc::make_mut(&mut self.tables_mut().data);
        tables
            .get_mut(name)
            .map(Arc::make_mut)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn create_table(&mut self, name: &str, columns: &[(&str, ColumnType)]) -> Result<()> {
        let tables = Arc::make_mut(&mut self.tables_mut().data);
        if tables.contains_key(name) {
            return Err(DbError::Duplicate {
                table: "information_schema.tables".into(),
                key: name.to_string(),
            });
        }
        let columns: BTreeMap<String, ColumnType> = columns
            .iter()
            .map(|(col, ty)| (col.to_string(), *ty))
            .collect();
        tables.insert(
            name.to_string(),
            Arc::new(DataTable {
                columns,
                rows: BTreeMap::new(),
                next_id: 0,
            }),
        );
        Ok(())
    }

    /// Insert or replace a row by id, returning the previous row.
    pub fn put_row(&mut self, table: &str, id: &str, row: Row) -> Result<Option<Row>> {
        let target = self.data_table_mut(table)?;
        if let Some(column) = row.keys().find(|c| !target.columns.contains_key(*c)) {
            return Err(DbError::ColumnNotFound {
                table: table.to_string(),
                column: column.clone(),
            });
        }
        if let Ok(numeric) = id.parse::<i64>() {
            target.next_id = target.next_id.max(numeric);
        }
        Ok(target.rows.insert(id.to_string(), row))
    }

    /// Insert with the next auto-increment id.
    pub fn insert_row(&mut self, table: &str, row: Row) -> Result<String> {
        let next = self.data_table_mut(table)?.next_id + 1;
        let id = next.to_string();
        self.put_row(table, &id, row)?;
        Ok(id)
    }

    pub fn delete_row(&mut self, table: &str, id: &str) -> Result<Option<Row>> {
        Ok(self.data_table_mut(table)?.rows.remove(id))
    }

    /// Put back a pre-image: `Some` restores the row, `None` deletes it.
    pub fn restore_row(&mut self, table: &str, id: &str, previous: Option<Row>) -> Result<()> {
        match previous {
            Some(row) => self.put_row(table, id, row).map(|_| ()),
            None => self.delete_row(table, id).map(|_| ()),
        }
    }
}
