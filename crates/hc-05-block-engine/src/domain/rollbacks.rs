//! Chained digest over the rollback rows of each block.
//!
//! `rollbacks_hash(b) = sha256(rollbacks_hash(b-1) || sha256(bincode(rows(b))))`
//!
//! Two nodes that played the same chain produce the same digest; a producer
//! on a diverged chain carries a different previous digest into its blocks.

use hc_02_state_store::RollbackRecord;
use shared_crypto::{sha256, Sha256Hasher};
use shared_types::Hash;

pub fn rollbacks_hash(prev: &Hash, rows: &[RollbackRecord]) -> Hash {
    let encoded = bincode::serialize(rows).unwrap_or_default();
    let rows_digest = sha256(&encoded);
    let mut hasher = Sha256Hasher::new();
    hasher.update(prev).update(&rows_digest);
    hasher.finalize()
}
