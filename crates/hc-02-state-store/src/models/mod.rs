//! # Models
//!
//! Typed access to the tables. Reads are methods on [`Tables`] and so work on
//! both the committed snapshot and an open [`DbTransaction`] (through
//! `Deref`); writes are methods on [`DbTransaction`].
//!
//! [`Tables`]: crate::Tables
//! [`DbTransaction`]: crate::DbTransaction

pub mod audit;
pub mod blockchain;
pub mod data;
pub mod mempool;
pub mod parameters;
pub mod schema;
