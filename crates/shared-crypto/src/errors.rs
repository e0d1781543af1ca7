//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The signature does not verify against the message and key.
    #[error("incorrect sign")]
    IncorrectSign,

    /// Invalid signature format
    #[error("invalid signature format: expected 64 bytes, got {0}")]
    InvalidSignatureFormat(usize),

    /// Invalid public key
    #[error("invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Invalid key length
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },
}
