//! Domain layer: node bans and the peer protocol messages.

pub mod ban;
pub mod messages;

pub use ban::{BadBlock, BanService};
pub use messages::{
    BlockBodies, BlockBodiesRequest, Frame, FullBlockPush, MaxBlockId, MessageKind, MissingTxs,
    TxBatch,
};
