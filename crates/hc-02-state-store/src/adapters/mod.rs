//! Adapters: snapshot file persistence and the data-directory lock.

pub mod lock;
pub mod snapshot_file;
