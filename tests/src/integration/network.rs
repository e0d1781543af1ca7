//! # Two Nodes Over TCP
//!
//! ```text
//!   client ──TxBatch──> producer ──QueueParserTx──> BlockGenerator
//!                          ▲
//!   follower ──BlockBodies─┘  (BlocksCollection)
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use hc_02_state_store::Database;
    use hc_03_block_codec::RawTransaction;
    use hc_07_dissemination::{PeerTransport, TcpTransport};
    use hc_08_daemons::DaemonContext;
    use node_runtime::daemons::{BlockGenerator, BlocksCollection, QueueParserTx, BLOCKS_COLLECTION};
    use node_runtime::{open_database, NodeConfig, NodeContext, PeerServer};
    use std::sync::Arc;
    use tokio::sync::watch;

    async fn serve(ctx: &Arc<NodeContext>) -> (String, watch::Sender<bool>) {
        let listener = PeerServer::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (stop, stopped) = watch::channel(false);
        tokio::spawn(PeerServer::new(ctx.clone()).run(listener, stopped));
        (addr, stop)
    }

    fn follower_of(addr: &str) -> Arc<NodeContext> {
        let mut config = NodeConfig::default();
        config.network.nodes_addr = vec![addr.to_string()];
        genesis_node_with(config, follower())
    }

    fn collection_ctx() -> DaemonContext {
        DaemonContext::new(BLOCKS_COLLECTION, Arc::new(watch::channel(false).0))
    }

    #[tokio::test]
    async fn test_submitted_transaction_reaches_follower() {
        let producer = genesis_node();
        let (addr, _stop) = serve(&producer).await;

        let tx = transfer(T0 + 1, 10, 42);
        TcpTransport::default()
            .send_transactions(&addr, &[RawTransaction::new(tx.data.clone())])
            .await
            .unwrap();
        assert!(eventually(|| producer.db.read(|t| t.pending_tx(&tx.hash).is_some())).await);

        QueueParserTx::new(producer.clone()).parse_queue().await.unwrap();
        let header = BlockGenerator::new(producer.clone())
            .generate_at(slot_time(1))
            .await
            .unwrap()
            .unwrap();

        let follower = follower_of(&addr);
        assert!(follower.params.this_node_position().is_err());
        let done = BlocksCollection::new(follower.clone())
            .collect(&collection_ctx())
            .await
            .unwrap();
        assert_eq!(done.inserted, 1);
        assert_eq!(follower.tip_id(), 2);
        follower.db.read(|t| {
            assert_eq!(t.info_block().unwrap().hash, header.hash);
            assert_eq!(t.log_transaction(&tx.hash), Some(2));
        });
    }

    #[tokio::test]
    async fn test_follower_abandons_fork_for_peer_chain() {
        let peer = genesis_node();
        extend(&peer, &[transfer(slot_time(1) - 1, 10, 7)]);
        extend(&peer, &[transfer(slot_time(2) - 1, 11, 7)]);
        let (addr, _stop) = serve(&peer).await;

        let ours = follower_of(&addr);
        extend(&ours, &[transfer(slot_time(1) - 1, 10, 5)]);
        assert_eq!(ours.tip_id(), 2);

        let done = BlocksCollection::new(ours.clone())
            .collect(&collection_ctx())
            .await
            .unwrap();
        assert_eq!(done.rolled_back, 1);
        assert_eq!(done.inserted, 2);
        assert_eq!(ours.tip_id(), 3);
        let (mine, theirs) = (
            ours.db.read(|t| t.info_block().cloned()).unwrap(),
            peer.db.read(|t| t.info_block().cloned()).unwrap(),
        );
        assert_eq!(mine.hash, theirs.hash);
        assert_eq!(mine.rollbacks_hash, theirs.rollbacks_hash);
    }

    #[tokio::test]
    async fn test_peer_answers_tip_and_bodies() {
        let ctx = genesis_node();
        let blocks: Vec<_> = (1..4)
            .map(|id| extend(&ctx, &[transfer(slot_time(id) - 1, 10, 1)]))
            .collect();
        let (addr, stop) = serve(&ctx).await;

        let client = TcpTransport::default();
        assert_eq!(client.max_block_id(&addr).await.unwrap(), 4);
        let bodies = client.get_blocks_bodies(&addr, 2, 10).await.unwrap();
        assert_eq!(bodies, blocks);

        stop.send_replace(true);
        assert!(eventually(|| std::net::TcpStream::connect(&addr).is_err()).await);
    }

    #[tokio::test]
    async fn test_file_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NodeConfig::default();
        config.directories.data_dir = dir.path().to_path_buf();
        config.database.dsn = Some(format!("file:{}", dir.path().display()));

        let tip = {
            let (db, lock) = open_database(&config).unwrap();
            let ctx = node_with(config.clone(), founder(), db);
            ctx.engine
                .insert_block_wo_forks(&genesis_block(), false, true)
                .unwrap();
            extend(&ctx, &[transfer(slot_time(1) - 1, 10, 3)]);
            ctx.db.close();
            drop(lock);
            ctx.db.read(|t| t.info_block().cloned()).unwrap()
        };

        let (db, _lock) = open_database(&config).unwrap();
        let ctx = node_with(config, founder(), db);
        assert_eq!(ctx.tip_id(), 2);
        assert_eq!(ctx.db.read(|t| t.info_block().cloned()).unwrap().hash, tip.hash);
        // block 1 is read back to seat the honor node
        assert_eq!(ctx.params.this_node_position().unwrap(), 0);
        let reopened: Database = ctx.db.clone();
        assert!(reopened.ping().is_ok());
    }
}
