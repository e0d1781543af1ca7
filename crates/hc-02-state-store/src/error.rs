//! Error types for the state store.

use thiserror::Error;

/// State store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// Another transaction committed after this one began.
    #[error("write conflict: transaction began at version {expected}, store is at {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("savepoint {0} does not exist")]
    SavepointNotFound(String),

    #[error("duplicate key {key} in {table}")]
    Duplicate { table: String, key: String },

    #[error("relation {0} does not exist")]
    TableNotFound(String),

    #[error("row {id} not found in {table}")]
    RowNotFound { table: String, id: String },

    #[error("column {column} does not exist in {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("snapshot persistence failed: {0}")]
    Persistence(String),

    #[error("database is closed")]
    Closed,
}

impl DbError {
    /// Errors caused by the caller's data rather than the store itself.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Duplicate { .. }
                | Self::TableNotFound(_)
                | Self::RowNotFound { .. }
                | Self::ColumnNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
