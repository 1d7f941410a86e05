//! Local cluster entry point

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use node::{ConfigSet, LocalLauncher};
use pilot::{ClusterConfig, ClusterOrchestrator};

/// Run a search cluster in this process
#[derive(Parser, Debug)]
#[command(name = "pilot")]
#[command(about = "Bring up a local search cluster and keep it running until Ctrl-C")]
struct Args {
    /// Cluster configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of nodes to start
    #[arg(short, long, default_value = "3")]
    nodes: usize,

    /// Config set files to upload (YAML format)
    #[arg(long = "config-set")]
    config_sets: Vec<PathBuf>,

    /// Root for node data and saved cluster state
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level, overrides the configuration file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ClusterConfig::from_file(path)?,
        None => ClusterConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        let rooted = ClusterConfig::with_base_dir(dir);
        config.node.node.data_dir = rooted.node.node.data_dir;
        config.data_dir = rooted.data_dir;
    }
    if let Some(level) = &args.log_level {
        config.node.log.level = level.clone();
    }
    config.node.log.init();

    info!("Starting cluster...");
    info!("  Nodes: {}", args.nodes);
    info!("  Coordinator: {}", config.coordinator_address);
    info!("  Data dir: {:?}", config.node.node.data_dir);

    let cluster =
        ClusterOrchestrator::bring_up(args.nodes, config, Arc::new(LocalLauncher::new())).await?;
    for path in &args.config_sets {
        cluster.upload_config_set(ConfigSet::from_file(path)?);
    }
    for node in cluster.nodes().await {
        info!("  {} at {}", node.name(), node.base_url());
    }

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    if let Err(e) = cluster.shutdown().await {
        for cause in e.causes() {
            warn!("  {}", cause);
        }
        return Err(e.into());
    }
    Ok(())
}
