//! # Block Codec (hc-03)
//!
//! Deterministic (un)marshaling of blocks.
//!
//! - [`unmarshal`] turns wire bytes into a [`ParsedBlock`] and computes the
//!   Merkle root of the carried transactions.
//! - [`marshal`] signs `ForSign(prev, merkle_root)` with the node key and
//!   produces the wire bytes.
//!
//! Transactions travel as opaque byte strings; parsing them is the
//! executor's job.

pub mod domain;
pub mod error;
pub mod service;

pub use domain::block::{block_hash, for_sign, tx_hash, ParsedBlock, RawTransaction};
pub use domain::merkle::merkle_root;
pub use error::{CodecError, Result};
pub use service::{encode, marshal, unmarshal, unmarshal_limited, FORMAT_VERSION};
