//! Decoded block and its signing domain.

use super::merkle::merkle_root;
use shared_crypto::double_sha256;
use shared_types::{BlockHeader, Hash};

/// One transaction as carried in the block stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    /// `sha256(sha256(data))`.
    pub hash: Hash,
    pub data: Vec<u8>,
}

impl RawTransaction {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            hash: tx_hash(&data),
            data,
        }
    }
}

/// Content address of a transaction.
pub fn tx_hash(data: &[u8]) -> Hash {
    double_sha256(data)
}

/// Result of decoding block bytes.
///
/// `header.hash` and `header.rollbacks_hash` are not on the wire: the hash
/// depends on the previous block and is set by [`ParsedBlock::compute_hash`],
/// the rollbacks hash is produced while playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub header: BlockHeader,
    /// Rollbacks hash of the previous block as claimed by the producer.
    pub prev_rollbacks_hash: Hash,
    pub transactions: Vec<RawTransaction>,
    pub merkle_root: Hash,
    /// Verbatim input bytes.
    pub bin_data: Vec<u8>,
}

impl ParsedBlock {
    pub fn tx_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(|t| t.hash).collect()
    }

    /// Signing domain against the given previous block hash.
    pub fn for_sign(&self, prev_hash: &Hash) -> String {
        for_sign(
            &self.header,
            prev_hash,
            &self.merkle_root,
            &self.prev_rollbacks_hash,
        )
    }

    /// Set and return `header.hash` for the given previous block hash.
    pub fn compute_hash(&mut self, prev_hash: &Hash) -> Hash {
        self.header.hash = block_hash(&self.for_sign(prev_hash));
        self.header.hash
    }

    /// Recompute the Merkle root from the carried transactions.
    pub fn recompute_merkle_root(&self) -> Hash {
        merkle_root(&self.tx_hashes())
    }
}

/// Canonical string the producer signs.
pub fn for_sign(
    header: &BlockHeader,
    prev_hash: &Hash,
    merkle_root: &Hash,
    prev_rollbacks_hash: &Hash,
) -> String {
    format!(
        "0,{},{},{},{},{},{},{},{}",
        header.block_id,
        hex::encode(prev_hash),
        header.time,
        header.ecosystem_id,
        header.key_id,
        header.node_position,
        hex::encode(merkle_root),
        hex::encode(prev_rollbacks_hash),
    )
}

/// Block hash: double SHA-256 of the ForSign string.
pub fn block_hash(for_sign: &str) -> Hash {
    double_sha256(for_sign.as_bytes())
}
