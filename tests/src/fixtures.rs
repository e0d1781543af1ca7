//! # Test Fixtures
//!
//! Every node built here runs on a [`ManualClock`] parked at `T0 + 1000`,
//! so blocks in 4-second slots after `T0` are never in the future.

use hc_02_state_store::Database;
use hc_03_block_codec::marshal;
use hc_04_transaction_executor::{smart_call, Transaction, TxHeader};
use hc_05_block_engine::{ManualClock, BLOCK_VERSION};
use hc_07_dissemination::{PeerTransport, TcpTransport};
use node_runtime::genesis::{build_first_block, GenesisConfig};
use node_runtime::{NodeConfig, NodeContext};
use shared_bus::{EventFilter, EventTopic, NodeEvent, Subscription};
use shared_crypto::{key_id_from_public, Ed25519KeyPair};
use shared_types::BlockHeader;
use std::sync::Arc;
use std::time::Duration;

pub const T0: i64 = 1_700_000_000;

/// Signs block 1 and every block of the test chains.
pub fn founder() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([1; 32])
}

pub fn follower() -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed([3; 32])
}

pub fn key_id(key: &Ed25519KeyPair) -> i64 {
    key_id_from_public(key.public_key().as_bytes())
}

/// Founder pays `amount` to `recipient` in `ecosystem`.
pub fn transfer_in(ecosystem: i64, time: i64, recipient: i64, amount: u32) -> Transaction {
    let key = founder();
    smart_call(
        &key,
        TxHeader::for_key(&key, time, ecosystem, 1),
        "MoneyTransfer",
        &[("recipient", &recipient.to_string()), ("amount", &amount.to_string())],
    )
    .unwrap()
}

pub fn transfer(time: i64, recipient: i64, amount: u32) -> Transaction {
    transfer_in(1, time, recipient, amount)
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

/// A founder-signed block on top of `prev` in the next slot.
pub fn block_on(prev: &BlockHeader, txs: &[Transaction]) -> Vec<u8> {
    let key = founder();
    let header = BlockHeader {
        block_id: prev.block_id + 1,
        time: slot_time(prev.block_id),
        ecosystem_id: 1,
        key_id: key_id(&key),
        node_position: 0,
        version: BLOCK_VERSION,
        ..Default::default()
    };
    let data: Vec<Vec<u8>> = txs.iter().map(|t| t.data.clone()).collect();
    marshal(&header, &data, prev, &key).unwrap().0
}

/// Start of the slot that follows block `block_id`.
pub fn slot_time(block_id: i64) -> i64 {
    T0 + 4 * block_id
}

pub fn node_with(config: NodeConfig, key: Ed25519KeyPair, db: Database) -> Arc<NodeContext> {
    node_with_transport(config, key, db, Arc::new(TcpTransport::default()))
}

pub fn node_with_transport(
    config: NodeConfig,
    key: Ed25519KeyPair,
    db: Database,
    transport: Arc<dyn PeerTransport>,
) -> Arc<NodeContext> {
    Arc::new(
        NodeContext::new_with_clock(config, key, db, transport, Arc::new(ManualClock::new(T0 + 1_000)))
            .unwrap(),
    )
}

/// The founder's node with block 1 committed.
pub fn genesis_node() -> Arc<NodeContext> {
    genesis_node_with(NodeConfig::default(), founder())
}

pub fn genesis_node_with(config: NodeConfig, key: Ed25519KeyPair) -> Arc<NodeContext> {
    let ctx = node_with(config, key, Database::in_memory());
    ctx.engine
        .insert_block_wo_forks(&genesis_block(), false, true)
        .unwrap();
    ctx
}

pub fn tip(ctx: &NodeContext) -> BlockHeader {
    ctx.engine.last_block().unwrap().unwrap()
}

/// Commit a block of `txs` on top of the tip and return its bytes.
pub fn extend(ctx: &NodeContext, txs: &[Transaction]) -> Vec<u8> {
    let block = block_on(&tip(ctx), txs);
    ctx.engine.insert_block_wo_forks(&block, false, false).unwrap();
    block
}

pub fn block_events(ctx: &NodeContext) -> Subscription {
    ctx.bus.subscribe(EventFilter::topics(vec![EventTopic::Blocks]))
}

/// Next committed or rejected block event.
pub async fn next_block_outcome(events: &mut Subscription) -> NodeEvent {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Some(e @ (NodeEvent::BlockCommitted { .. } | NodeEvent::BlockRejected { .. })) => return e,
                Some(_) => {}
                None => panic!("event bus closed"),
            }
        }
    })
    .await
    .unwrap()
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..250 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
