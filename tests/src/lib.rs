//! # Honor-Chain Test Suite
//!
//! ```text
//! tests/
//! ├── src/fixtures.rs       # keys, transactions, nodes, blocks
//! ├── src/integration/
//! │   ├── scenarios.rs      # genesis, push, reject, generate, fork, rollback
//! │   ├── network.rs        # two nodes talking over TCP
//! │   └── rollback_replay.rs
//! └── benches/              # codec and engine throughput
//! ```
//!
//! ```bash
//! cargo test -p hc-tests
//! cargo test -p hc-tests integration::scenarios::
//! cargo bench -p hc-tests
//! ```

#![allow(clippy::unwrap_used)]

pub mod fixtures;
pub mod integration;
