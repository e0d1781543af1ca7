use super::builder::{read_first_block, GenesisError};
use crate::context::NodeContext;
use crate::error::Result;
use hc_01_system_parameters::SystemParameters;
use hc_02_state_store::Database;
use hc_03_block_codec::unmarshal;
use hc_04_transaction_executor::{Transaction, TxBody};
use shared_types::{BlockHeader, FirstBlockData};
use tracing::{info, warn};

/// Commit block 1 into an empty chain. Returns `None` when the chain already
/// has blocks.
pub async fn initial_load(ctx: &NodeContext) -> Result<Option<BlockHeader>> {
    if ctx.tip_id() != 0 {
        return Ok(None);
    }

    let path = ctx.config.directories.first_block_path();
    let bytes = match read_first_block(&path)? {
        Some(bytes) => {
            info!(path = %path.display(), "[node] loading first block from file");
            bytes
        }
        None => fetch_first_block(ctx).await?,
    };

    let _guard = ctx.db_lock.lock().await;
    let header = ctx.engine.insert_block_wo_forks(&bytes, false, true)?;
    info!(
        block_id = header.block_id,
        hash = %hex::encode(header.hash),
        "[node] 🌱 first block committed"
    );
    Ok(Some(header))
}

async fn fetch_first_block(ctx: &NodeContext) -> Result<Vec<u8>> {
    let host = ctx
        .params
        .bootstrap_hosts()
        .first()
        .cloned()
        .ok_or_else(|| GenesisError::Unavailable("no first block file and no bootstrap host".into()))?;
    info!(host = %host, "[node] fetching first block");
    let mut bodies = ctx.transport.get_blocks_bodies(&host, 1, 1).await?;
    if bodies.is_empty() {
        return Err(GenesisError::Unavailable(format!("{host} returned no blocks")).into());
    }
    Ok(bodies.swap_remove(0))
}

/// Refill the first-block handle from the stored block 1. Returns whether a
/// block 1 was found.
pub fn restore_first_block_data(db: &Database, params: &SystemParameters) -> Result<bool> {
    let Some(row) = db.read(|t| t.block(1).cloned()) else {
        return Ok(false);
    };
    let parsed = unmarshal(&row.data).map_err(GenesisError::from)?;
    for raw in &parsed.transactions {
        let tx = Transaction::parse(&raw.data)?;
        if let TxBody::FirstBlock(body) = tx.body {
            params.set_first_block_data(FirstBlockData {
                time: body.header.time,
                key_id: body.header.key_id,
                public_key: body.header.public_key,
                node_public_key: body.node_public_key,
                test: body.test,
                private_blockchain: body.private_blockchain,
            });
            return Ok(true);
        }
    }
    warn!("[node] block 1 carries no first block transaction");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::{build_first_block, write_first_block, GenesisConfig};
    use crate::testing::{founder, node_with, ChainTransport, T0};
    use crate::error::NodeError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::NodeConfig::default();
        config.directories.keys_dir = dir.path().to_path_buf();
        let bytes = build_first_block(
            &founder(),
            &GenesisConfig {
                time: T0,
                ..Default::default()
            },
        )
        .unwrap();
        write_first_block(&config.directories.first_block_path(), &bytes).unwrap();

        let ctx = node_with(config, Arc::new(ChainTransport::default()));
        let header = initial_load(&ctx).await.unwrap().unwrap();
        assert_eq!(header.block_id, 1);
        assert_eq!(ctx.tip_id(), 1);
        assert_eq!(ctx.params.first_block_data().unwrap().time, T0);

        // second start is a no-op
        assert!(initial_load(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetches_from_bootstrap_host() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::NodeConfig::default();
        config.directories.keys_dir = dir.path().to_path_buf();
        config.network.nodes_addr = vec!["10.0.0.1:7078".into()];
        let genesis = build_first_block(
            &founder(),
            &GenesisConfig {
                time: T0,
                ..Default::default()
            },
        )
        .unwrap();

        let ctx = node_with(config, Arc::new(ChainTransport::new(vec![genesis])));
        initial_load(&ctx).await.unwrap().unwrap();
        assert_eq!(ctx.tip_id(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::NodeConfig::default();
        config.directories.keys_dir = dir.path().to_path_buf();
        let ctx = node_with(config, Arc::new(ChainTransport::default()));
        assert!(matches!(
            initial_load(&ctx).await,
            Err(NodeError::Genesis(GenesisError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_first_block_data_restored_on_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::NodeConfig::default();
        config.directories.keys_dir = dir.path().to_path_buf();
        let bytes = build_first_block(
            &founder(),
            &GenesisConfig {
                time: T0,
                test: true,
                ..Default::default()
            },
        )
        .unwrap();
        write_first_block(&config.directories.first_block_path(), &bytes).unwrap();
        let ctx = node_with(config, Arc::new(ChainTransport::default()));
        initial_load(&ctx).await.unwrap();

        let fresh = SystemParameters::new(vec![], vec![]);
        assert!(fresh.first_block_data().is_err());
        assert!(restore_first_block_data(&ctx.db, &fresh).unwrap());
        let data = fresh.first_block_data().unwrap();
        assert!(data.test);
        assert_eq!(data.node_public_key, founder().public_key().as_bytes().to_vec());
    }
}
