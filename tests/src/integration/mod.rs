//! Cross-crate flows driven through the node runtime.

mod network;
mod rollback_replay;
mod scenarios;
