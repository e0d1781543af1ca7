//! # Disseminator
//!
//! One iteration of the dissemination daemon:
//!
//! ```text
//!   honor node?
//!     yes ─> unsent info_block + unsent txs ─┬─ good hosts:   block + txs
//!                                            └─ banned hosts: txs only
//!     no  ─> unsent txs ──────────────────────── default remote hosts
//!   then: mark info_block and txs sent
//! ```
//!
//! Sends to all hosts run concurrently. A payload is marked sent as soon as
//! one host accepted it.

use crate::domain::BanService;
use crate::error::{DisseminationError, Result, TransportError};
use crate::ports::PeerTransport;
use futures::future::join_all;
use hc_01_system_parameters::SystemParameters;
use hc_02_state_store::Database;
use hc_03_block_codec::RawTransaction;
use hc_telemetry::DISSEMINATION_SENT;
use shared_types::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// What one iteration pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dissemination {
    /// Another iteration is still running.
    Busy,
    Nothing,
    Sent {
        block_id: Option<i64>,
        txs: usize,
        hosts: usize,
        failed: usize,
    },
}

pub struct Disseminator {
    db: Database,
    params: Arc<SystemParameters>,
    bans: Arc<BanService>,
    transport: Arc<dyn PeerTransport>,
    db_lock: Arc<Mutex<()>>,
    busy: AtomicBool,
}

/// Clears the busy flag when the iteration ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Outgoing {
    block_id: Option<i64>,
    block: Option<Vec<u8>>,
    txs: Vec<RawTransaction>,
}

impl Disseminator {
    pub fn new(
        db: Database,
        params: Arc<SystemParameters>,
        bans: Arc<BanService>,
        transport: Arc<dyn PeerTransport>,
        db_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            db,
            params,
            bans,
            transport,
            db_lock,
            busy: AtomicBool::new(false),
        }
    }

    pub fn bans(&self) -> &Arc<BanService> {
        &self.bans
    }

    pub async fn run_once(&self) -> Result<Dissemination> {
        self.run_once_at(unix_now()).await
    }

    /// One iteration with `now` (unix seconds) as the ban clock.
    pub async fn run_once_at(&self, now: i64) -> Result<Dissemination> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[hc-07] previous iteration still running");
            return Ok(Dissemination::Busy);
        }
        let _guard = BusyGuard(&self.busy);
        let _db = self.db_lock.lock().await;

        match self.params.this_node_position() {
            Ok(position) => self.send_as_honor_node(position, now).await,
            Err(_) => self.send_transactions_only().await,
        }
    }

    async fn send_as_honor_node(&self, position: i64, now: i64) -> Result<Dissemination> {
        let out = self.collect(true);
        if out.block.is_none() && out.txs.is_empty() {
            return Ok(Dissemination::Nothing);
        }

        let (good, banned) = self.bans.filter_hosts(self.params.remote_hosts(), now);
        if !banned.is_empty() {
            debug!(banned = banned.len(), "[hc-07] banned hosts get transactions only");
        }
        let block = out.block.as_deref();
        let sends = good
            .iter()
            .map(|host| (host, block))
            .chain(banned.iter().map(|host| (host, None)))
            .map(|(host, block)| self.transport.send_full_block(host, position, block, &out.txs));
        let results = join_all(sends).await;
        let hosts = results.len();
        // banned hosts never see the block, so only good hosts can deliver it
        let delivered = good.is_empty() || results[..good.len()].iter().any(|r| r.is_ok());
        let failed = check_results(hosts, results)?;

        let block_id = out.block_id.filter(|_| delivered);
        if out.block_id.is_some() && !delivered {
            warn!(block_id = ?out.block_id, "[hc-07] no good host took the block, keeping it unsent");
        }
        self.mark_sent(block_id.is_some(), &out.txs)?;
        if block_id.is_some() {
            DISSEMINATION_SENT.with_label_values(&["block"]).inc();
        }
        if !out.txs.is_empty() {
            DISSEMINATION_SENT.with_label_values(&["txs"]).inc();
        }
        info!(
            block_id = ?block_id,
            txs = out.txs.len(),
            hosts,
            failed,
            "[hc-07] 📡 disseminated"
        );
        Ok(Dissemination::Sent {
            block_id,
            txs: out.txs.len(),
            hosts,
            failed,
        })
    }

    async fn send_transactions_only(&self) -> Result<Dissemination> {
        let out = self.collect(false);
        if out.txs.is_empty() {
            return Ok(Dissemination::Nothing);
        }
        let hosts = self.params.default_remote_hosts();
        if hosts.is_empty() {
            // nowhere to send; keep the txs unsent until a peer is known
            return Ok(Dissemination::Nothing);
        }
        let results = join_all(
            hosts
                .iter()
                .map(|host| self.transport.send_transactions(host, &out.txs)),
        )
        .await;
        let failed = check_results(hosts.len(), results)?;

        self.mark_sent(false, &out.txs)?;
        DISSEMINATION_SENT.with_label_values(&["txs"]).inc();
        debug!(txs = out.txs.len(), hosts = hosts.len(), failed, "[hc-07] transactions pushed");
        Ok(Dissemination::Sent {
            block_id: None,
            txs: out.txs.len(),
            hosts: hosts.len(),
            failed,
        })
    }

    fn collect(&self, with_block: bool) -> Outgoing {
        let limit = self.params.max_tx_count();
        self.db.read(|t| {
            let info = if with_block { t.unsent_info_block() } else { None };
            let block = info.and_then(|i| t.block(i.block_id)).map(|row| row.data.clone());
            Outgoing {
                block_id: block.as_ref().and(info.map(|i| i.block_id)),
                block,
                txs: t
                    .unsent_transactions(limit)
                    .into_iter()
                    .map(|p| RawTransaction { hash: p.hash, data: p.data })
                    .collect(),
            }
        })
    }

    fn mark_sent(&self, block: bool, txs: &[RawTransaction]) -> Result<()> {
        let mut dbtx = self.db.begin()?;
        if block {
            dbtx.mark_info_block_sent();
        }
        let hashes: Vec<Hash> = txs.iter().map(|t| t.hash).collect();
        dbtx.mark_transactions_sent(&hashes);
        dbtx.commit()?;
        Ok(())
    }
}

/// Number of failed hosts, or an error when nobody accepted the payload.
fn check_results(hosts: usize, results: Vec<std::result::Result<(), TransportError>>) -> Result<usize> {
    let mut failed = 0;
    let mut last = None;
    for err in results.into_iter().filter_map(|r| r.err()) {
        warn!(error = %err, "[hc-07] peer send failed");
        failed += 1;
        last = Some(err);
    }
    match last {
        Some(last) if failed == hosts => Err(DisseminationError::AllHostsFailed { hosts, last }),
        _ => Ok(failed),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockTransport, Sent};
    use hc_01_system_parameters::{names, DEFAULT_PARAMETERS};
    use hc_02_state_store::{BlockRow, PendingTx};
    use shared_types::{HonorNode, InfoBlock};

    const T0: i64 = 1_700_000_000;

    struct Fixture {
        db: Database,
        params: Arc<SystemParameters>,
    }

    fn node(host: &str, key: u8) -> HonorNode {
        HonorNode {
            tcp_address: host.to_string(),
            api_address: String::new(),
            public_key: vec![key; 32],
            stopped: false,
        }
    }

    /// Three honor nodes; this node holds key 1.
    fn fixture(own_key: u8) -> Fixture {
        let nodes = vec![node("10.0.0.1:7078", 1), node("10.0.0.2:7078", 2), node("10.0.0.3:7078", 3)];
        let db = Database::in_memory();
        let mut tx = db.begin().unwrap();
        tx.seed_system_parameters(DEFAULT_PARAMETERS.iter().copied());
        tx.set_system_parameter(names::HONOR_NODES, &serde_json::to_string(&nodes).unwrap());
        tx.set_system_parameter(names::LOCAL_NODE_BAN_TIME, "60000");
        tx.commit().unwrap();
        let params = SystemParameters::new(vec![own_key; 32], vec!["10.0.0.9:7078".into()]);
        db.read(|t| params.refresh(t)).unwrap();
        Fixture {
            db,
            params: Arc::new(params),
        }
    }

    impl Fixture {
        fn disseminator(&self, transport: Arc<MockTransport>) -> Disseminator {
            Disseminator::new(
                self.db.clone(),
                self.params.clone(),
                Arc::new(BanService::new(self.params.clone())),
                transport,
                Arc::new(Mutex::new(())),
            )
        }

        fn add_block(&self, id: i64) {
            let mut tx = self.db.begin().unwrap();
            tx.insert_block(BlockRow {
                id,
                hash: [id as u8; 32],
                data: format!("block-{id}").into_bytes(),
                time: T0,
                ..Default::default()
            })
            .unwrap();
            tx.update_info_block(InfoBlock {
                hash: [id as u8; 32],
                block_id: id,
                time: T0,
                sent: false,
                ..Default::default()
            });
            tx.commit().unwrap();
        }

        fn add_tx(&self, body: &[u8]) {
            let mut tx = self.db.begin().unwrap();
            let raw = RawTransaction::new(body.to_vec());
            tx.insert_pending_tx(PendingTx::new(raw.hash, raw.data, 1, 1, T0)).unwrap();
            tx.commit().unwrap();
        }

        fn unsent(&self) -> (bool, usize) {
            self.db
                .read(|t| (t.unsent_info_block().is_some(), t.unsent_transactions(100).len()))
        }
    }

    #[tokio::test]
    async fn test_nothing_to_send() {
        let f = fixture(1);
        let transport = Arc::new(MockTransport::default());
        let d = f.disseminator(transport.clone());
        assert_eq!(d.run_once_at(T0).await.unwrap(), Dissemination::Nothing);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_honor_node_pushes_block_and_marks_sent() {
        let f = fixture(1);
        f.add_block(2);
        f.add_tx(b"tx-a");
        let transport = Arc::new(MockTransport::default());
        let d = f.disseminator(transport.clone());

        let result = d.run_once_at(T0).await.unwrap();
        assert_eq!(
            result,
            Dissemination::Sent {
                block_id: Some(2),
                txs: 1,
                hosts: 2,
                failed: 0
            }
        );
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|s| matches!(
            s,
            Sent::FullBlock { honor_node_id: 0, block: Some(b), txs: 1, .. } if b == b"block-2"
        )));
        assert_eq!(f.unsent(), (false, 0));

        // second pass has nothing left
        assert_eq!(d.run_once_at(T0).await.unwrap(), Dissemination::Nothing);
    }

    #[tokio::test]
    async fn test_banned_host_gets_no_block() {
        let f = fixture(1);
        f.add_block(2);
        f.add_tx(b"tx-a");
        let transport = Arc::new(MockTransport::default());
        let d = f.disseminator(transport.clone());
        d.bans().register_bad_block(&[3u8; 32], 1, T0, "bad sign");

        d.run_once_at(T0 + 1).await.unwrap();
        let sent = transport.sent();
        let to = |host: &str| {
            sent.iter()
                .find(|s| matches!(s, Sent::FullBlock { host: h, .. } if h == host))
                .cloned()
        };
        assert!(matches!(to("10.0.0.2:7078"), Some(Sent::FullBlock { block: Some(_), .. })));
        assert!(matches!(to("10.0.0.3:7078"), Some(Sent::FullBlock { block: None, txs: 1, .. })));
    }

    #[tokio::test]
    async fn test_partial_failure_still_marks_sent() {
        let f = fixture(1);
        f.add_tx(b"tx-a");
        let transport = Arc::new(MockTransport::failing(&["10.0.0.2:7078"]));
        let d = f.disseminator(transport.clone());

        let result = d.run_once_at(T0).await.unwrap();
        assert!(matches!(result, Dissemination::Sent { failed: 1, hosts: 2, .. }));
        assert_eq!(f.unsent(), (false, 0));
    }

    #[tokio::test]
    async fn test_block_stays_unsent_when_only_banned_host_accepts() {
        let f = fixture(1);
        f.add_block(2);
        f.add_tx(b"tx-a");
        let transport = Arc::new(MockTransport::failing(&["10.0.0.2:7078"]));
        let d = f.disseminator(transport.clone());
        d.bans().register_bad_block(&[3u8; 32], 1, T0, "bad sign");

        let result = d.run_once_at(T0 + 1).await.unwrap();
        assert_eq!(
            result,
            Dissemination::Sent {
                block_id: None,
                txs: 1,
                hosts: 2,
                failed: 1
            }
        );
        assert!(transport
            .sent()
            .iter()
            .all(|s| matches!(s, Sent::FullBlock { block: None, .. })));
        // the txs went out, the block waits for a good host
        assert_eq!(f.unsent(), (true, 0));
    }

    #[tokio::test]
    async fn test_all_hosts_failing_keeps_payload() {
        let f = fixture(1);
        f.add_block(2);
        let transport = Arc::new(MockTransport::failing(&["10.0.0.2:7078", "10.0.0.3:7078"]));
        let d = f.disseminator(transport);

        let err = d.run_once_at(T0).await.unwrap_err();
        assert!(matches!(err, DisseminationError::AllHostsFailed { hosts: 2, .. }));
        assert_eq!(f.unsent(), (true, 0));
    }

    #[tokio::test]
    async fn test_non_honor_node_sends_transactions_only() {
        let f = fixture(9);
        f.add_block(2);
        f.add_tx(b"tx-a");
        f.add_tx(b"tx-b");
        let transport = Arc::new(MockTransport::default());
        let d = f.disseminator(transport.clone());

        let result = d.run_once_at(T0).await.unwrap();
        assert!(matches!(result, Dissemination::Sent { block_id: None, txs: 2, hosts: 3, .. }));
        assert!(transport
            .sent()
            .iter()
            .all(|s| matches!(s, Sent::Transactions { txs: 2, .. })));
        // the block belongs to whoever produced it
        assert_eq!(f.unsent(), (true, 0));
    }

    #[tokio::test]
    async fn test_busy_iteration_is_skipped() {
        let f = fixture(1);
        let d = f.disseminator(Arc::new(MockTransport::default()));
        d.busy.store(true, Ordering::Release);
        assert_eq!(d.run_once_at(T0).await.unwrap(), Dissemination::Busy);
        d.busy.store(false, Ordering::Release);
        assert_eq!(d.run_once_at(T0).await.unwrap(), Dissemination::Nothing);
    }
}
