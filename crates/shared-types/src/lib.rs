//! # Shared Types Crate
//!
//! Domain entities shared by every crate of the block pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: headers, honor nodes, info-block and
//!   notification payloads are defined here and nowhere else.
//! - **Plain Data**: no I/O, no locks. Behaviour lives in the subsystem crates.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
