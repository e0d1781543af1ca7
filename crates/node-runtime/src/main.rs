//! # Honor-Chain Node
//!
//! ```text
//! node-runtime generate-keys            write <keys_dir>/PrivateKey
//! node-runtime generate-first-block     write <keys_dir>/first_block.bin
//! node-runtime start                    run until ctrl-c or network stop
//! node-runtime rollback --block-id N    undo every block above N
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hc_telemetry::{TelemetryConfig, TelemetryGuard};
use node_runtime::genesis::{build_first_block, write_first_block, GenesisConfig};
use node_runtime::{NodeConfig, NodeKeys, NodeRuntime};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Parser)]
#[command(name = "node-runtime", about = "Honor-Chain node")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the node.
    Start,
    /// Create the node key.
    GenerateKeys,
    /// Create block 1 signed by the node key.
    GenerateFirstBlock {
        /// Build a test network (no stop-network key).
        #[arg(long)]
        test: bool,
        #[arg(long)]
        private_blockchain: bool,
    },
    /// Roll the chain back so that `block_id` is the tip.
    Rollback {
        #[arg(long)]
        block_id: i64,
    },
}

fn init_telemetry(config: &NodeConfig) -> Result<TelemetryGuard> {
    let mut telemetry = TelemetryConfig::from_env();
    telemetry.log_level = config.telemetry.log_level.clone();
    telemetry.json_logs |= config.telemetry.json_logs;
    hc_telemetry::init_telemetry(&telemetry).context("telemetry setup")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = NodeConfig::load(cli.config.as_deref()).context("configuration")?;
    let _telemetry = init_telemetry(&config)?;

    match cli.command {
        Command::GenerateKeys => {
            let keys = NodeKeys::generate(&config.directories.keys_dir)?;
            info!(key_id = keys.key_id(), path = %keys.path().display(), "[node] 🔑 node key written");
        }
        Command::GenerateFirstBlock {
            test,
            private_blockchain,
        } => {
            let keys = NodeKeys::load(&config.directories.keys_dir)?;
            let time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
            let genesis = GenesisConfig {
                time,
                test,
                private_blockchain,
                ..Default::default()
            };
            let bytes = build_first_block(keys.key_pair(), &genesis)?;
            let path = config.directories.first_block_path();
            write_first_block(&path, &bytes)?;
            info!(path = %path.display(), size = bytes.len(), "[node] first block written");
        }
        Command::Rollback { block_id } => {
            let runtime = NodeRuntime::open(config)?;
            let undone = runtime.context().rollback.to_block_id(block_id)?;
            runtime.context().db.close();
            info!(block_id, undone, "[node] rollback finished");
        }
        Command::Start => {
            let runtime = NodeRuntime::open(config)?;
            let running = runtime.start().await?;

            let shutdown = runtime.shutdown_handle();
            let mut stopped = shutdown.subscribe();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("[node] ctrl-c received");
                        shutdown.send_replace(true);
                    }
                    _ = stopped.changed() => {}
                }
            });

            info!("[node] running, press Ctrl+C to stop");
            runtime.wait(running).await;
        }
    }
    Ok(())
}
