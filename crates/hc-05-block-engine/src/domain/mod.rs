//! Domain layer: block model, limits, slots and the rollbacks digest.

pub mod block;
pub mod limits;
pub mod rollbacks;
pub mod slots;
pub mod state;

pub use block::{stored_header, Block, BLOCK_VERSION};
pub use limits::{LimitMode, Limits};
pub use rollbacks::rollbacks_hash;
pub use slots::BlockTimeCounter;
pub use state::BlockState;
