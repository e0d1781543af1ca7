//! Merkle root over transaction hashes.

use shared_crypto::{sha256, Sha256Hasher};
use shared_types::Hash;

/// Root of the tree whose leaves are `sha256(tx_hash)`. Odd layers duplicate
/// their last node. An empty list hashes the empty string.
pub fn merkle_root(tx_hashes: &[Hash]) -> Hash {
    if tx_hashes.is_empty() {
        return sha256(b"");
    }

    let mut level: Vec<Hash> = tx_hashes.iter().map(|h| sha256(h)).collect();

    while level.len() > 1 {
        let mut next_level = Vec::with_capacity((level.len() + 1) / 2);

        for chunk in level.chunks(2) {
            let left = &chunk[0];
            let right = chunk.get(1).unwrap_or(left);
            next_level.push(hash_concat(left, right));
        }

        level = next_level;
    }

    level[0]
}

fn hash_concat(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256Hasher::new();
    hasher.update(left).update(right);
    hasher.finalize()
}
