//! ovsdb-probed - Open vSwitch topology probe daemon
//!
//! Entry point for the probe daemon. Builds the topology graph and its host
//! node, attaches an OVSDB probe to it and runs until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ovsdb_probe::{OvsdbProbe, ProbeConfig, TableUpdates, DEFAULT_CONFIG_PATH};
use topology_graph::{topology, Graph};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "ovsdb-probed", version, about = "Open vSwitch topology probe")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// OVSDB address, overrides `ovs.ovsdb` from the configuration
    #[arg(long)]
    ovsdb: Option<String>,

    /// JSON file holding a list of table-updates objects to deliver on start
    #[arg(long)]
    replay: Option<PathBuf>,
}

/// Initializes tracing/logging subsystem
fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {}", e))
}

/// Reads a replay file: either one table-updates object or a list of them
fn load_replay(path: &PathBuf) -> Result<Vec<TableUpdates>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read replay file {}", path.display()))?;
    let doc: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse replay file {}", path.display()))?;

    let batches = match &doc {
        serde_json::Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    batches
        .into_iter()
        .map(|b| TableUpdates::from_json(b).map_err(anyhow::Error::from))
        .collect()
}

/// Waits for SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for SIGINT")?;
            info!("received SIGINT");
        }
        _ = term.recv() => info!("received SIGTERM"),
    }
    Ok(())
}

/// Waits for Ctrl-C
#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("received shutdown signal");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ProbeConfig::load_or_default(&args.config)?;
    if let Some(ovsdb) = args.ovsdb {
        config.ovs.ovsdb = ovsdb;
    }

    init_logging(&config.logging.level)?;
    config.validate()?;

    info!("--- Starting ovsdb-probed ---");

    let graph = Arc::new(Graph::new());
    let root = {
        let mut g = graph.lock();
        topology::new_root_node(&mut g, &config.probe.host)?
    };

    let probe = OvsdbProbe::from_config(graph.clone(), root, &config)?;
    probe.start()?;
    info!(address = %probe.monitor().address(), host = %config.probe.host, "probe started");

    if let Some(path) = &args.replay {
        let sender = probe.monitor().sender();
        for batch in load_replay(path)? {
            if sender.send(batch).await.is_err() {
                warn!("monitor channel closed, stopping replay");
                break;
            }
        }
        info!(file = %path.display(), "replay queued");
    }

    shutdown_signal().await?;

    probe.stop();

    let stats = probe.stats();
    let g = graph.lock();
    info!(
        nodes = g.node_count(),
        edges = g.edge_count(),
        interfaces = stats.interfaces,
        ports = stats.ports,
        pending_interface_links = stats.pending_interface_links,
        pending_port_links = stats.pending_port_links,
        "ovsdb-probed exiting"
    );

    Ok(())
}
