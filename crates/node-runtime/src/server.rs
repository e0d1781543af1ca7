//! # Peer Server
//!
//! Answers the framed peer protocol, one request per connection.
//!
//! | Kind | Request | Reply |
//! |------|---------|-------|
//! | 1 | `BlockBodiesRequest` | `BlockBodies` |
//! | 2 | `FullBlockPush` | `MissingTxs`, then a `TxBatch` from the peer |
//! | 3 | `TxBatch` | none |
//! | 4 | empty | `MaxBlockId` |
//!
//! A pushed block that directly extends the tip is committed at once. One
//! further ahead only lands in `queue_blocks` for block collection.

use crate::api::NodeApi;
use crate::context::NodeContext;
use hc_02_state_store::QueueBlock;
use hc_03_block_codec::unmarshal;
use hc_07_dissemination::{
    read_frame, write_frame, BlockBodies, BlockBodiesRequest, Frame, FullBlockPush, MaxBlockId,
    MessageKind, MissingTxs, TransportError, TxBatch,
};
use shared_crypto::double_sha256;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Most block bodies served per request.
pub const MAX_BODIES_PER_REQUEST: u32 = 1_000;

#[derive(Clone)]
pub struct PeerServer {
    ctx: Arc<NodeContext>,
    api: NodeApi,
}

impl PeerServer {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        Self {
            api: NodeApi::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn bind(addr: &str) -> std::io::Result<TcpListener> {
        TcpListener::bind(addr).await
    }

    /// Accept until `shutdown` flips to true.
    pub async fn run(self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "[node] 🌐 peer server listening");
        }
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = self.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle(stream).await {
                                debug!(%peer, error = %e, "[node] peer request failed");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "[node] accept failed"),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("[node] peer server stopped");
    }

    async fn handle(&self, mut stream: TcpStream) -> Result<(), TransportError> {
        let max = self.ctx.config.transport.max_frame_size;
        let frame = read_frame(&mut stream, max).await?;
        let peer = stream.peer_addr().ok();
        match frame.kind {
            MessageKind::BlockBodies => {
                let request: BlockBodiesRequest = frame.expect(MessageKind::BlockBodies)?;
                let reply = self.block_bodies(&request);
                write_frame(&mut stream, &Frame::encode(MessageKind::BlockBodies, &reply)?).await
            }
            MessageKind::FullBlock => {
                let push: FullBlockPush = frame.expect(MessageKind::FullBlock)?;
                let missing = self.missing_txs(&push.tx_hashes);
                let asked = !missing.hashes.is_empty();
                write_frame(&mut stream, &Frame::encode(MessageKind::FullBlock, &missing)?).await?;
                if asked {
                    let batch: TxBatch = read_frame(&mut stream, max)
                        .await?
                        .expect(MessageKind::Transactions)?;
                    self.accept_txs(&batch).await;
                }
                if let Some(block) = push.block {
                    self.accept_block(push.honor_node_id, &block, peer).await;
                }
                Ok(())
            }
            MessageKind::Transactions => {
                let batch: TxBatch = frame.expect(MessageKind::Transactions)?;
                self.accept_txs(&batch).await;
                Ok(())
            }
            MessageKind::MaxBlockId => {
                let reply = MaxBlockId {
                    block_id: self.ctx.tip_id(),
                };
                write_frame(&mut stream, &Frame::encode(MessageKind::MaxBlockId, &reply)?).await
            }
        }
    }

    fn block_bodies(&self, request: &BlockBodiesRequest) -> BlockBodies {
        let count = request.count.min(MAX_BODIES_PER_REQUEST) as usize;
        let blocks = self
            .ctx
            .db
            .read(|t| t.blocks_from(request.from_id, count))
            .into_iter()
            .map(|row| row.data)
            .collect();
        BlockBodies { blocks }
    }

    fn missing_txs(&self, hashes: &[shared_types::Hash]) -> MissingTxs {
        let mut seen = HashSet::new();
        let hashes = self.ctx.db.read(|t| {
            hashes
                .iter()
                .filter(|h| seen.insert(**h))
                .filter(|h| {
                    t.pending_tx(h).is_none()
                        && t.log_transaction(h).is_none()
                        && t.bad_transaction(h).is_none()
                })
                .copied()
                .collect()
        });
        MissingTxs { hashes }
    }

    async fn accept_txs(&self, batch: &TxBatch) {
        let mut accepted = 0;
        for data in &batch.txs {
            match self.api.submit(data).await {
                Ok(_) => accepted += 1,
                Err(e) => debug!(error = %e, "[node] peer transaction refused"),
            }
        }
        debug!(received = batch.txs.len(), accepted, "[node] peer transactions");
    }

    async fn accept_block(&self, honor_node_id: i64, data: &[u8], peer: Option<SocketAddr>) {
        let parsed = match unmarshal(data) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(?peer, honor_node_id, error = %e, "[node] undecodable pushed block");
                return;
            }
        };
        let block_id = parsed.header.block_id;

        let _guard = self.ctx.db_lock.lock().await;
        let tip = self.ctx.tip_id();
        if block_id <= tip {
            return;
        }
        if block_id == tip + 1 {
            match self.ctx.engine.insert_block_wo_forks(data, false, false) {
                Ok(_) => return,
                Err(err) if err.is_fork_hint() => {
                    debug!(block_id, error = %err, "[node] pushed block needs collection");
                }
                Err(err) => {
                    self.ctx.report_bad_block(honor_node_id, block_id, &err);
                    return;
                }
            }
        }

        let mut dbtx = match self.ctx.db.begin() {
            Ok(dbtx) => dbtx,
            Err(e) => {
                warn!(error = %e, "[node] queueing pushed block");
                return;
            }
        };
        dbtx.create_queue_block(QueueBlock {
            hash: double_sha256(data),
            block_id,
            honor_node_id,
        });
        if let Err(e) = dbtx.commit() {
            warn!(error = %e, "[node] queueing pushed block");
            return;
        }
        debug!(block_id, honor_node_id, "[node] block queued");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{genesis_node, next_block, transfer, T0};
    use hc_07_dissemination::{PeerTransport, TcpTransport};
    use hc_03_block_codec::RawTransaction;

    async fn serve(ctx: Arc<NodeContext>) -> (String, watch::Sender<bool>) {
        let listener = PeerServer::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(PeerServer::new(ctx).run(listener, rx));
        (addr, tx)
    }

    #[tokio::test]
    async fn test_serves_tip_and_bodies() {
        let ctx = Arc::new(genesis_node().await);
        let (addr, _stop) = serve(ctx.clone()).await;
        let client = TcpTransport::default();

        assert_eq!(client.max_block_id(&addr).await.unwrap(), 1);
        let bodies = client.get_blocks_bodies(&addr, 1, 10).await.unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0], ctx.db.read(|t| t.block(1).unwrap().data.clone()));
        assert!(client.get_blocks_bodies(&addr, 5, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transactions_land_in_mempool() {
        let ctx = Arc::new(genesis_node().await);
        let (addr, _stop) = serve(ctx.clone()).await;
        let tx = transfer(T0 + 1, 5);
        let raw = RawTransaction::new(tx.data.clone());

        TcpTransport::default()
            .send_transactions(&addr, &[raw])
            .await
            .unwrap();
        // the server handles the request after the client hangs up
        for _ in 0..50 {
            if ctx.db.read(|t| t.pending_tx(&tx.hash).is_some()) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("transaction never reached the mempool");
    }

    #[tokio::test]
    async fn test_full_block_push_commits_next_block() {
        let ctx = Arc::new(genesis_node().await);
        let (addr, _stop) = serve(ctx.clone()).await;
        let block = next_block(&ctx, &[transfer(T0 + 1, 5)]);
        let pending = RawTransaction::new(transfer(T0 + 2, 6).data);

        TcpTransport::default()
            .send_full_block(&addr, 0, Some(&block), &[pending.clone()])
            .await
            .unwrap();
        for _ in 0..50 {
            let done = ctx.db.read(|t| t.pending_tx(&pending.hash).is_some()) && ctx.tip_id() == 2;
            if done {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        panic!("pushed block was not committed");
    }

    #[tokio::test]
    async fn test_block_ahead_is_queued() {
        let ctx = Arc::new(genesis_node().await);
        let server = PeerServer::new(ctx.clone());
        let mut block = unmarshal(&next_block(&ctx, &[transfer(T0 + 1, 5)])).unwrap();
        block.header.block_id = 5;
        let txs: Vec<Vec<u8>> = block.transactions.iter().map(|t| t.data.clone()).collect();
        let data = hc_03_block_codec::encode(&block.header, &block.prev_rollbacks_hash, &txs).unwrap();

        server.accept_block(0, &data, None).await;
        let queued = ctx.db.read(|t| t.queue_blocks());
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].block_id, 5);
        assert_eq!(ctx.tip_id(), 1);
    }

    #[tokio::test]
    async fn test_missing_txs_skips_known() {
        let ctx = Arc::new(genesis_node().await);
        let server = PeerServer::new(ctx.clone());
        let known = transfer(T0 + 1, 5);
        server.api.submit(&known.data).await.unwrap();
        let fresh = transfer(T0 + 2, 5);

        let missing = server.missing_txs(&[known.hash, fresh.hash, fresh.hash]);
        assert_eq!(missing.hashes, vec![fresh.hash]);
    }
}
