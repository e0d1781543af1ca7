//! # State Store (hc-02)
//!
//! The relational state every other crate reads and writes: `block_chain`,
//! `info_block`, `log_transactions`, the mempool, audit tables, system
//! parameters and the per-ecosystem data tables.
//!
//! ## Transaction Model
//!
//! ```text
//!   committed snapshot ──begin()──> DbTransaction (private working copy)
//!          ▲                              │ savepoint("mark_block_0")
//!          │                              │ ... writes ...
//!          │                              │ rollback_to_savepoint / release_savepoint
//!          └──────────commit()────────────┘
//! ```
//!
//! - Readers never block on writers: they see the last committed snapshot.
//! - Tables are `Arc`-shared and copied on first write, so savepoints are
//!   cheap and only touched tables are duplicated.
//! - A commit fails with [`DbError::Conflict`] if another commit landed since
//!   `begin()`. Callers serialize writers with the node-wide DB lock.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - row types and the table set
//! - `models/` - typed queries and mutations, one file per table family
//! - `ports/` - snapshot persistence SPI
//! - `adapters/` - bincode snapshot file, data-directory lock
//! - `service.rs` - `Database` and `DbTransaction`

pub mod adapters;
pub mod domain;
pub mod error;
pub mod models;
pub mod ports;
pub mod service;

pub use adapters::lock::{DatabaseLock, LockError};
pub use adapters::snapshot_file::FileSnapshotStore;
pub use domain::rows::{
    BadTransaction, BlockRow, ColumnType, MigrationRecord, PendingTx, QueueBlock, RollbackRecord,
    Row, TxStatus,
};
pub use domain::tables::{DataTable, Tables};
pub use error::{DbError, Result};
pub use models::schema::{install_schema, SCHEMA_VERSION};
pub use ports::outbound::SnapshotStore;
pub use service::{Database, DbTransaction};
