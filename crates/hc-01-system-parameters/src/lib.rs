//! # System Parameters (hc-01)
//!
//! In-memory snapshot of the `system_parameters` table and everything
//! derived from it.
//!
//! ```text
//!  system_parameters ──refresh()──> ┌──────────────────────────────┐
//!                                   │ values   name -> text         │
//!                                   │ nodes    honor set, positions │
//!                                   │ fuels    ecosystem -> rate    │
//!                                   │ wallets  ecosystem -> account │
//!                                   └──────────────────────────────┘
//! ```
//!
//! ## Locking
//!
//! One reader-writer lock guards the parameter state. Reads take it shared;
//! `refresh()` builds the new state outside the lock and swaps it in. The
//! byte-column catalog and the node key carry their own locks.
//!
//! Lock order across the node is `DBLock -> parameter writer lock -> VM`.
//! Readers of this cache never hold `DBLock`.

pub mod domain;
pub mod error;
pub mod service;

pub use domain::catalog::ColumnCatalog;
pub use domain::defaults::DEFAULT_PARAMETERS;
pub use domain::names;
pub use domain::nodes::{parse_ecosystem_pairs, HonorNodeSet};
pub use error::{ParamError, Result};
pub use service::{number_of_nodes_from_db, SystemParameters};
