//! Transactions, the contract VM registries, fuel and randomness.

pub mod ban;
pub mod fuel;
pub mod rand;
pub mod transaction;
pub mod vm;
