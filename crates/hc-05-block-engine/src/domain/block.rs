//! The block as the engine sees it while moving it through the pipeline.

use super::state::BlockState;
use crate::error::{BlockError, Result};
use hc_02_state_store::BlockRow;
use hc_03_block_codec::{block_hash, for_sign, unmarshal, ParsedBlock};
use hc_04_transaction_executor::Transaction;
use shared_types::{BlockHeader, Hash, Notification};

/// Header version written by this node.
pub const BLOCK_VERSION: i32 = 1;

#[derive(Debug, Clone)]
pub struct Block {
    pub header: BlockHeader,
    pub prev_header: Option<BlockHeader>,
    /// Rollbacks hash of the previous block, as carried by the producer.
    pub prev_rollbacks_hash: Hash,
    pub merkle_root: Hash,
    pub bin_data: Vec<u8>,
    pub transactions: Vec<Transaction>,
    /// A transaction changed system parameters.
    pub sys_update: bool,
    /// Produced by this node.
    pub gen_block: bool,
    pub notifications: Vec<Notification>,
    pub state: BlockState,
}

impl Block {
    /// Parse and verify every carried transaction.
    pub fn from_parsed(parsed: ParsedBlock) -> Result<Self> {
        let transactions = parsed
            .transactions
            .iter()
            .map(|raw| {
                Transaction::parse_verified(&raw.data).map_err(|e| {
                    BlockError::UnmarshallBlock(format!("tx {}: {e}", hex::encode(raw.hash)))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            header: parsed.header,
            prev_header: None,
            prev_rollbacks_hash: parsed.prev_rollbacks_hash,
            merkle_root: parsed.merkle_root,
            bin_data: parsed.bin_data,
            transactions,
            sys_update: false,
            gen_block: false,
            notifications: Vec::new(),
            state: BlockState::Unmarshalled,
        })
    }

    pub fn id(&self) -> i64 {
        self.header.block_id
    }

    pub fn is_genesis(&self) -> bool {
        self.header.is_genesis()
    }

    /// Signing domain against our copy of the previous block. The carried
    /// `prev_rollbacks_hash` is not used: a producer on another chain fails
    /// verification here.
    pub fn for_sign(&self, prev: &BlockHeader) -> String {
        for_sign(&self.header, &prev.hash, &self.merkle_root, &prev.rollbacks_hash)
    }

    /// Set `header.hash` against our copy of the previous block.
    pub fn compute_hash(&mut self, prev: &BlockHeader) -> Hash {
        self.header.hash = block_hash(&self.for_sign(prev));
        self.header.hash
    }

    pub fn tx_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(|t| t.hash).collect()
    }

    pub fn tx_data(&self) -> Vec<Vec<u8>> {
        self.transactions.iter().map(|t| t.data.clone()).collect()
    }

    /// Row written to `block_chain` for this block.
    pub fn to_row(&self) -> BlockRow {
        BlockRow {
            id: self.header.block_id,
            hash: self.header.hash,
            rollbacks_hash: self.header.rollbacks_hash,
            data: self.bin_data.clone(),
            ecosystem_id: self.header.ecosystem_id,
            key_id: self.header.key_id,
            node_position: self.header.node_position,
            time: self.header.time,
            tx: self.transactions.len() as i32,
        }
    }
}

/// Header of a committed block: decoded from its stored bytes, with the
/// locally computed hashes taken from the row.
pub fn stored_header(row: &BlockRow) -> Result<BlockHeader> {
    let parsed = unmarshal(&row.data)?;
    let mut header = parsed.header;
    header.hash = row.hash;
    header.rollbacks_hash = row.rollbacks_hash;
    Ok(header)
}
