//! Deterministic per-transaction randomness.

use rand_chacha::{rand_core::SeedableRng as _, ChaCha20Rng};
use shared_crypto::Sha256Hasher;
use shared_types::Hash;

/// PRNG seeded by `sha256(block_time_le || tx_hash)`: every node replaying
/// the same block draws the same sequence.
pub fn tx_rand(block_time: i64, tx_hash: &Hash) -> ChaCha20Rng {
    let mut hasher = Sha256Hasher::new();
    hasher.update(&block_time.to_le_bytes()).update(tx_hash);
    ChaCha20Rng::from_seed(hasher.finalize())
}
