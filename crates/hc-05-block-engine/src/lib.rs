//! # Block Engine (hc-05)
//!
//! Turns block bytes into committed state, or into a classified rejection.
//!
//! ## Pipeline
//!
//! | Step | Function | Fails with |
//! |------|----------|------------|
//! | Decode | [`BlockEngine::process_block`] | size, malformed, missing previous block |
//! | Validate | [`BlockEngine::check`] | time, slot, signature, duplicates, per-user cap |
//! | Apply | [`BlockEngine::play_safe`] | transaction errors, limits |
//!
//! Generation goes through the same pipeline: [`BlockEngine::generate_block`]
//! signs a candidate block and hands it to
//! [`BlockEngine::insert_block_wo_forks`] with `gen_block` set, which turns
//! most limit violations into skips instead of rejections.
//!
//! ## Crate Structure
//!
//! - `domain/` - block model, limits meter, slot counter, rollbacks digest
//! - `ports/` - time source
//! - `adapters/` - manual clock for tests and replay
//! - `service.rs` - [`BlockEngine`]

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::ManualClock;
pub use config::{EngineConfig, SysUpdatePolicy};
pub use domain::{
    rollbacks_hash, stored_header, Block, BlockState, BlockTimeCounter, LimitMode, Limits,
    BLOCK_VERSION,
};
pub use error::{BlockError, LimitError, Result};
pub use ports::{SystemTimeSource, TimeSource};
pub use service::{BlockEngine, EngineDependencies};
