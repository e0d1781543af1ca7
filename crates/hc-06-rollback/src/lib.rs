//! # Rollback (hc-06)
//!
//! Rewinds the chain. Used by the `rollback` command and by block collection
//! when a peer's chain diverges from ours.
//!
//! Writers must hold the node DB lock, as for block commits.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod service;

pub use error::{Result, RollbackError};
pub use service::{RollbackEffects, RollbackService};
