//! Adapters layer (Hexagonal Architecture)

pub mod probe;
