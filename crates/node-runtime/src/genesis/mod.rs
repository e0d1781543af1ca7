//! # Genesis
//!
//! Creating block 1 for a new network and loading it into an empty node.
//!
//! ## Initial Load
//!
//! 1. Skip when `info_block.block_id != 0`
//! 2. Read the first block file (`keys_dir/first_block.bin` by default)
//! 3. Otherwise fetch block 1 from the first bootstrap host
//! 4. Commit it through the engine with `first_block` set
//!
//! On every later start the first-block handle is restored from the stored
//! block 1, since playing it is what normally fills it in.

pub mod builder;
pub mod loader;

pub use builder::{build_first_block, read_first_block, write_first_block, GenesisConfig, GenesisError};
pub use loader::{initial_load, restore_first_block_data};
