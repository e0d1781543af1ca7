//! # Honor-Chain Node Runtime
//!
//! Everything between the pipeline crates and the process: configuration,
//! node keys, the first block, the peer protocol server, the submission API
//! and the four daemons.
//!
//! | Module | Role |
//! |--------|------|
//! | `config` | TOML file plus `HC_*` overrides |
//! | `keys` | the node's Ed25519 key file |
//! | `genesis` | building and loading block 1 |
//! | `context` | shared handles every component works through |
//! | `api` | transaction submission and counters |
//! | `server` | TCP peer protocol |
//! | `daemons` | disseminator, generator, collection, queue parser |
//! | `runtime` | start-up and shutdown |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::type_complexity)]

pub mod api;
pub mod config;
pub mod context;
pub mod daemons;
pub mod error;
pub mod genesis;
pub mod keys;
pub mod runtime;
pub mod server;

#[cfg(test)]
mod testing;

pub use api::{Counters, NodeApi};
pub use config::NodeConfig;
pub use context::NodeContext;
pub use error::{NodeError, Result};
pub use keys::NodeKeys;
pub use runtime::{open_database, NodeRuntime, RunningNode};
pub use server::PeerServer;
