pub mod block;
pub mod merkle;
