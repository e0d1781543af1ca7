//! # Block Pipeline Scenarios
//!
//! | Scenario | Entry point |
//! |----------|-------------|
//! | genesis load | `initial_load` with `first_block.bin` on disk |
//! | received block | TCP push to a running `PeerServer` |
//! | failing transaction | TCP push, whole block refused |
//! | limit hit while generating | `BlockGenerator` with `max_tx_block = 3` |
//! | fork hash divergence | block of a diverged peer |
//! | rollback to N | `RollbackService::to_block_id` |

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use hc_01_system_parameters::names;
    use hc_02_state_store::Database;
    use hc_03_block_codec::{merkle_root, unmarshal};
    use hc_05_block_engine::BlockError;
    use hc_07_dissemination::{PeerTransport, TcpTransport};
    use hc_08_daemons::{Daemon, DaemonContext};
    use node_runtime::daemons::{BlockGenerator, QueueParserTx};
    use node_runtime::genesis::{initial_load, write_first_block};
    use node_runtime::{NodeApi, NodeConfig, NodeContext, PeerServer};
    use shared_bus::NodeEvent;
    use shared_types::{Hash, RejectKind};
    use std::sync::Arc;
    use tokio::sync::watch;

    /// Serve `ctx` on an ephemeral port until the returned sender flips.
    async fn serve(ctx: &Arc<NodeContext>) -> (String, watch::Sender<bool>) {
        let listener = PeerServer::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (stop, stopped) = watch::channel(false);
        tokio::spawn(PeerServer::new(ctx.clone()).run(listener, stopped));
        (addr, stop)
    }

    // =========================================================================
    // GENESIS
    // =========================================================================

    #[tokio::test]
    async fn test_genesis_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NodeConfig::default();
        config.directories.keys_dir = dir.path().to_path_buf();
        write_first_block(&config.directories.first_block_path(), &genesis_block()).unwrap();

        let ctx = node_with(config, founder(), Database::in_memory());
        assert_eq!(ctx.tip_id(), 0);

        let header = initial_load(&ctx).await.unwrap().unwrap();
        assert_eq!(header.block_id, 1);
        ctx.db.read(|t| {
            assert_eq!(t.info_block().unwrap().block_id, 1);
            assert_eq!(t.block_count(), 1);
        });
        assert_eq!(ctx.params.this_node_position().unwrap(), 0);

        // a second start finds the chain already there
        assert!(initial_load(&ctx).await.unwrap().is_none());
        assert_eq!(ctx.db.read(|t| t.block_count()), 1);
    }

    // =========================================================================
    // RECEIVED BLOCKS
    // =========================================================================

    #[tokio::test]
    async fn test_pushed_block_is_committed() {
        let ctx = genesis_node();
        let (addr, _stop) = serve(&ctx).await;
        let mut events = block_events(&ctx);

        let txs = vec![transfer(slot_time(1) - 1, 10, 100), transfer(slot_time(1) - 1, 11, 200)];
        let block = block_on(&tip(&ctx), &txs);
        TcpTransport::default()
            .send_full_block(&addr, 0, Some(&block), &[])
            .await
            .unwrap();

        match next_block_outcome(&mut events).await {
            NodeEvent::BlockCommitted {
                block_id, tx_count, generated, ..
            } => {
                assert_eq!(block_id, 2);
                assert_eq!(tx_count, 2);
                assert!(!generated);
            }
            other => panic!("unexpected {other:?}"),
        }
        ctx.db.read(|t| {
            let info = t.info_block().unwrap();
            assert_eq!(info.block_id, 2);
            assert!(info.sent);
            assert_eq!(t.log_transaction(&txs[0].hash), Some(2));
            assert_eq!(t.log_transaction(&txs[1].hash), Some(2));
            assert_eq!(t.bad_transactions_count(), 0);
            assert_eq!(t.log_transactions_of_block(2).len(), 2);
        });
    }

    #[tokio::test]
    async fn test_failing_transaction_rejects_whole_block() {
        let ctx = genesis_node();
        let (addr, _stop) = serve(&ctx).await;
        let mut events = block_events(&ctx);
        let before = ctx.db.read(|t| (t.info_block().cloned(), t.tx_status_count(), t.bad_transactions_count()));

        let time = slot_time(1) - 1;
        // ecosystem 2 does not exist, so the second transfer fails on its tables
        let txs = vec![
            transfer(time, 10, 100),
            transfer_in(2, time, 11, 100),
            transfer(time, 12, 100),
        ];
        let block = block_on(&tip(&ctx), &txs);
        TcpTransport::default()
            .send_full_block(&addr, 0, Some(&block), &[])
            .await
            .unwrap();

        match next_block_outcome(&mut events).await {
            NodeEvent::BlockRejected {
                block_id, kind, bannable, ..
            } => {
                assert_eq!(block_id, 2);
                assert_eq!(kind, RejectKind::Io);
                assert!(!bannable);
            }
            other => panic!("unexpected {other:?}"),
        }
        let after = ctx.db.read(|t| (t.info_block().cloned(), t.tx_status_count(), t.bad_transactions_count()));
        assert_eq!(before, after);
        ctx.db.read(|t| {
            assert!(t.block(2).is_none());
            assert!(txs.iter().all(|tx| t.log_transaction(&tx.hash).is_none()));
        });
        assert!(!ctx.bans.is_banned(founder().public_key().as_bytes(), ctx.now()));
    }

    #[tokio::test]
    async fn test_bannable_block_bans_its_producer() {
        let ctx = genesis_node();
        let (addr, _stop) = serve(&ctx).await;
        let mut events = block_events(&ctx);

        let tx = transfer(slot_time(1) - 1, 10, 1);
        let block = block_on(&tip(&ctx), &[tx.clone(), tx]);
        TcpTransport::default()
            .send_full_block(&addr, 0, Some(&block), &[])
            .await
            .unwrap();

        assert!(matches!(
            next_block_outcome(&mut events).await,
            NodeEvent::BlockRejected { bannable: true, .. }
        ));
        let producer = founder().public_key().as_bytes().to_vec();
        assert!(eventually(|| ctx.bans.is_banned(&producer, ctx.now())).await);
        assert_eq!(ctx.bans.bad_blocks(&producer)[0].block_id, 2);
    }

    // =========================================================================
    // GENERATION
    // =========================================================================

    #[tokio::test]
    async fn test_generation_stops_at_block_limit() {
        let ctx = genesis_node();
        {
            let mut dbtx = ctx.db.begin().unwrap();
            dbtx.set_system_parameter(names::MAX_TX_BLOCK, "3");
            dbtx.commit().unwrap();
            ctx.engine.reload_parameters().unwrap();
        }

        let api = NodeApi::new(ctx.clone());
        let txs: Vec<_> = (0..5).map(|i| transfer(T0 + 1, 20 + i, 10)).collect();
        for tx in &txs {
            api.submit(&tx.data).await.unwrap();
        }
        assert_eq!(QueueParserTx::new(ctx.clone()).parse_queue().await.unwrap(), (5, 0));

        let generator = BlockGenerator::new(ctx.clone());
        let header = generator.generate_at(slot_time(1)).await.unwrap().unwrap();
        assert_eq!(header.block_id, 2);

        let row = ctx.db.read(|t| t.block(2).cloned()).unwrap();
        assert_eq!(row.tx, 3);
        let parsed = unmarshal(&row.data).unwrap();
        let committed: Vec<Hash> = parsed.tx_hashes();
        assert_eq!(parsed.merkle_root, merkle_root(&committed));
        assert_eq!(parsed.header.sign, header.sign);
        ctx.db.read(|t| {
            assert_eq!(t.log_transactions_of_block(2).len(), 3);
            let left: Vec<_> = txs.iter().filter(|tx| t.pending_tx(&tx.hash).is_some()).collect();
            assert_eq!(left.len(), 2);
            assert!(left.iter().all(|tx| !committed.contains(&tx.hash)));
            // generated blocks wait for the disseminator
            assert!(!t.info_block().unwrap().sent);
        });

        // the rest goes into the next slot
        let next = generator.generate_at(slot_time(2)).await.unwrap().unwrap();
        assert_eq!(next.block_id, 3);
        assert_eq!(ctx.db.read(|t| t.block(3).map(|b| b.tx)), Some(2));
    }

    #[tokio::test]
    async fn test_generator_skips_empty_mempool() {
        let ctx = genesis_node();
        let dctx = DaemonContext::new("BlockGenerator", Arc::new(watch::channel(false).0));
        BlockGenerator::new(ctx.clone()).run(&dctx).await.unwrap();
        assert_eq!(ctx.tip_id(), 1);
    }

    // =========================================================================
    // FORKS AND ROLLBACK
    // =========================================================================

    #[tokio::test]
    async fn test_fork_surfaces_rollback_hash_mismatch() {
        let ours = genesis_node();
        let theirs = genesis_node();
        extend(&ours, &[transfer(slot_time(1) - 1, 10, 5)]);
        extend(&theirs, &[transfer(slot_time(1) - 1, 10, 7)]);
        let their_next = extend(&theirs, &[transfer(slot_time(2) - 1, 11, 7)]);

        let err = ours
            .engine
            .insert_block_wo_forks(&their_next, false, false)
            .unwrap_err();
        assert!(matches!(err, BlockError::IncorrectRollbackHash));
        assert!(err.is_fork_hint());
        assert!(!err.is_bannable());
        assert_eq!(ours.tip_id(), 2);
    }

    #[tokio::test]
    async fn test_rollback_to_n() {
        const N: i64 = 3;
        let ctx = genesis_node();
        let mut txs = Vec::new();
        for id in 1..N + 10 {
            let tx = transfer(slot_time(id) - 1, 30 + id, id as u32);
            extend(&ctx, std::slice::from_ref(&tx));
            txs.push(tx);
        }
        assert_eq!(ctx.tip_id(), N + 10);
        let kept = ctx.db.read(|t| t.block(N).cloned()).unwrap();

        assert_eq!(ctx.rollback.to_block_id(N).unwrap(), 10);

        ctx.db.read(|t| {
            assert_eq!(t.info_block().unwrap().block_id, N);
            assert_eq!(t.info_block().unwrap().hash, kept.hash);
            assert_eq!(t.max_block().unwrap().id, N);
            assert!((N + 1..=N + 10).all(|id| t.block(id).is_none()));

            let requeued = t.unverified_transactions(100);
            assert_eq!(requeued.len(), 10);
            for tx in &txs[(N - 1) as usize..] {
                assert!(t.log_transaction(&tx.hash).is_none());
                assert!(!t.pending_tx(&tx.hash).unwrap().verified);
            }
            for tx in &txs[..(N - 1) as usize] {
                assert!(t.log_transaction(&tx.hash).is_some());
            }
        });

        // the queue parser takes them back in
        let (verified, rejected) = QueueParserTx::new(ctx.clone()).parse_queue().await.unwrap();
        assert_eq!((verified, rejected), (10, 0));
    }
}
