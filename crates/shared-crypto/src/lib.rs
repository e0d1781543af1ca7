//! # Shared Crypto - Hashing and Node Keys
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256, double SHA-256 | Tx hashes, Merkle tree, block hash |
//! | `signatures` | Ed25519 | Block headers, transactions, node identity |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - Secret key material is zeroized on drop

#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{double_sha256, sha256, Sha256Hasher};
pub use signatures::{key_id_from_public, verify_signature, Ed25519KeyPair, Ed25519PublicKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
