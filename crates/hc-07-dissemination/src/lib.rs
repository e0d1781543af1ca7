//! # Dissemination (hc-07)
//!
//! Gets locally produced blocks and pending transactions out to peers.
//!
//! ## Components
//!
//! | Part | Role |
//! |------|------|
//! | [`Disseminator`] | one daemon iteration: block + txs to good peers, txs to banned peers |
//! | [`BanService`] | local bans for producers of bad blocks, escalating per day |
//! | [`TcpTransport`] | framed peer protocol client |
//! | [`read_frame`] / [`write_frame`] | framing shared with the node's TCP server |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - bans and protocol messages
//! - `ports/` - `PeerTransport`
//! - `adapters/` - TCP
//! - `service.rs` - `Disseminator`

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{read_frame, write_frame, TcpTransport};
pub use config::{TransportConfig, DEFAULT_MAX_FRAME_SIZE};
pub use domain::{
    BadBlock, BanService, BlockBodies, BlockBodiesRequest, Frame, FullBlockPush, MaxBlockId,
    MessageKind, MissingTxs, TxBatch,
};
pub use error::{DisseminationError, Result, TransportError};
pub use ports::PeerTransport;
pub use service::{Dissemination, Disseminator};
