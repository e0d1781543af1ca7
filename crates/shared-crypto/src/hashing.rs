//! # SHA-256 Hashing
//!
//! Transaction hashes and block hashes are double SHA-256; Merkle nodes are
//! single SHA-256.

use sha2::{Digest, Sha256};

/// SHA-256 output (256-bit).
pub type Hash = [u8; 32];

/// Stateful SHA-256 hasher.
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl Default for Sha256Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// `sha256(sha256(data))`.
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256(&sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty_vector() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello ").update(b"world");
        assert_eq!(hasher.finalize(), sha256(b"hello world"));
    }

    #[test]
    fn test_double_hash_differs_from_single() {
        let data = b"block";
        assert_ne!(double_sha256(data), sha256(data));
        assert_eq!(double_sha256(data), sha256(&sha256(data)));
    }
}
