//! Adapters layer (Hexagonal Architecture)

pub mod clock;

pub use clock::ManualClock;
