//! Shared fixtures for the runtime's unit tests.

use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::genesis::{build_first_block, GenesisConfig};
use async_trait::async_trait;
use hc_02_state_store::Database;
use hc_03_block_codec::{marshal, RawTransaction};
use hc_04_transaction_executor::{smart_call, Transaction, TxHeader};
use hc_05_block_engine::{ManualClock, BLOCK_VERSION};
use hc_07_dissemination::{PeerTransport, TransportError};
use parking_lot::Mutex;
use shared_crypto::{key_id_from_public, Ed25519KeyPair};
use shared_types::BlockHeader;
use std::sync::Arc;

pub const T0: i64 = 1_700_000_000;

pub fn founder() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([1; 32])
}

pub fn user() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([2; 32])
}

/// Founder pays `amount` to a fresh account.
pub fn transfer(time: i64, amount: u32) -> Transaction {
    let key = founder();
    let recipient = key_id_from_public(user().public_key().as_bytes());
    smart_call(
        &key,
        TxHeader::for_key(&key, time, 1, 1),
        "MoneyTransfer",
        &[("recipient", &recipient.to_string()), ("amount", &amount.to_string())],
    )
    .unwrap()
}

/// A peer that serves `chain` and records what it is sent.
#[derive(Default)]
pub struct ChainTransport {
    pub chain: Mutex<Vec<Vec<u8>>>,
    pub pushed: Mutex<Vec<(String, Option<Vec<u8>>, usize)>>,
    pub failing: Vec<String>,
}

impl ChainTransport {
    pub fn new(chain: Vec<Vec<u8>>) -> Self {
        Self {
            chain: Mutex::new(chain),
            ..Default::default()
        }
    }

    fn check(&self, host: &str) -> Result<(), TransportError> {
        if self.failing.iter().any(|h| h == host) {
            return Err(TransportError::Unreachable(host.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for ChainTransport {
    async fn send_full_block(
        &self,
        host: &str,
        _honor_node_id: i64,
        block: Option<&[u8]>,
        txs: &[RawTransaction],
    ) -> Result<(), TransportError> {
        self.check(host)?;
        self.pushed
            .lock()
            .push((host.to_string(), block.map(<[u8]>::to_vec), txs.len()));
        Ok(())
    }

    async fn send_transactions(&self, host: &str, txs: &[RawTransaction]) -> Result<(), TransportError> {
        self.check(host)?;
        self.pushed.lock().push((host.to_string(), None, txs.len()));
        Ok(())
    }

    async fn get_blocks_bodies(&self, host: &str, from_id: i64, count: u32) -> Result<Vec<Vec<u8>>, TransportError> {
        self.check(host)?;
        Ok(self
            .chain
            .lock()
            .iter()
            .skip((from_id - 1).max(0) as usize)
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn max_block_id(&self, host: &str) -> Result<i64, TransportError> {
        self.check(host)?;
        Ok(self.chain.lock().len() as i64)
    }
}

pub fn node_with(config: NodeConfig, transport: Arc<dyn PeerTransport>) -> NodeContext {
    NodeContext::new_with_clock(
        config,
        founder(),
        Database::in_memory(),
        transport,
        Arc::new(ManualClock::new(T0 + 1_000)),
    )
    .unwrap()
}

pub fn node() -> NodeContext {
    node_with(NodeConfig::default(), Arc::new(ChainTransport::default()))
}

pub fn genesis_block() -> Vec<u8> {
    build_first_block(
        &founder(),
        &GenesisConfig {
            time: T0,
            test: true,
            ..Default::default()
        },
    )
    .unwrap()
}

/// A founder-run node with block 1 committed.
pub async fn genesis_node() -> NodeContext {
    genesis_node_with(Arc::new(ChainTransport::default())).await
}

pub async fn genesis_node_with(transport: Arc<dyn PeerTransport>) -> NodeContext {
    let ctx = node_with(NodeConfig::default(), transport);
    ctx.engine
        .insert_block_wo_forks(&genesis_block(), false, true)
        .unwrap();
    ctx
}

/// The founder's block on top of `prev` in the next 4-second slot.
pub fn block_on(prev: &BlockHeader, txs: &[Transaction]) -> Vec<u8> {
    let key = founder();
    let header = BlockHeader {
        block_id: prev.block_id + 1,
        time: T0 + 4 * prev.block_id,
        ecosystem_id: 1,
        key_id: key_id_from_public(key.public_key().as_bytes()),
        node_position: 0,
        version: BLOCK_VERSION,
        ..Default::default()
    };
    let data: Vec<Vec<u8>> = txs.iter().map(|t| t.data.clone()).collect();
    marshal(&header, &data, prev, &key).unwrap().0
}

pub fn next_block(ctx: &NodeContext, txs: &[Transaction]) -> Vec<u8> {
    let tip = ctx.engine.last_block().unwrap().unwrap();
    block_on(&tip, txs)
}
