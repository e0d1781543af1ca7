//! # Peer Protocol Messages
//!
//! Every message is one frame:
//!
//! ```text
//! ┌──────────┬───────────────┬──────────────────────┐
//! │ kind: u8 │ len: u32 (BE) │ payload (bincode)    │
//! └──────────┴───────────────┴──────────────────────┘
//! ```
//!
//! | Kind | Request | Reply |
//! |------|---------|-------|
//! | 1 BlockBodies | [`BlockBodiesRequest`] | [`BlockBodies`] |
//! | 2 FullBlock | [`FullBlockPush`] | [`MissingTxs`], then the sender pushes [`TxBatch`] as kind 3 |
//! | 3 Transactions | [`TxBatch`] | none |
//! | 4 MaxBlockId | empty | [`MaxBlockId`] |
//!
//! Block bytes inside payloads are the codec's wire format, untouched.

use crate::error::TransportError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    BlockBodies = 1,
    FullBlock = 2,
    Transactions = 3,
    MaxBlockId = 4,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockBodies => "block_bodies",
            Self::FullBlock => "full_block",
            Self::Transactions => "transactions",
            Self::MaxBlockId => "max_block_id",
        }
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = TransportError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::BlockBodies),
            2 => Ok(Self::FullBlock),
            3 => Ok(Self::Transactions),
            4 => Ok(Self::MaxBlockId),
            other => Err(TransportError::UnknownKind(other)),
        }
    }
}

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn encode<T: Serialize>(kind: MessageKind, body: &T) -> Result<Self, TransportError> {
        Ok(Self {
            kind,
            payload: bincode::serialize(body)?,
        })
    }

    pub fn empty(kind: MessageKind) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        Ok(bincode::deserialize(&self.payload)?)
    }

    /// Decode, insisting on `kind`.
    pub fn expect<T: DeserializeOwned>(&self, kind: MessageKind) -> Result<T, TransportError> {
        if self.kind != kind {
            return Err(TransportError::UnexpectedReply {
                expected: kind.as_str(),
                got: self.kind.as_str(),
            });
        }
        self.decode()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBodiesRequest {
    pub from_id: i64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBodies {
    pub blocks: Vec<Vec<u8>>,
}

/// A producer's push: its newest block, if unsent, and the hashes of its
/// unsent transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullBlockPush {
    pub honor_node_id: i64,
    pub block: Option<Vec<u8>>,
    pub tx_hashes: Vec<Hash>,
}

/// Hashes the receiver does not hold yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingTxs {
    pub hashes: Vec<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBatch {
    pub txs: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxBlockId {
    pub block_id: i64,
}
