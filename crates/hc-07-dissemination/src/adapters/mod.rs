//! Adapters layer (Hexagonal Architecture)

pub mod tcp;

pub use tcp::{read_frame, write_frame, TcpTransport};
