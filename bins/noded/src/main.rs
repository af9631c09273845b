use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use noded_cluster::MemoryClusterClient;
use noded_controller::{bootstrap_coordination_store, SystemdController};
use noded_health::ProbeEvaluator;
use noded_manager::{Manager, ManagerConfig};
use noded_service::load_services_from_file;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// noded - node service supervisor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Node configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Supervise the node's services (default)
    Run,
    /// One-shot bootstrap of the cluster coordination store, for use
    /// before the supervisor can run
    Bootstrap,
}

/// Node configuration file shape.
#[derive(Debug, Clone, Deserialize)]
struct NodeConfig {
    /// This node's address, advertised in endpoint strings.
    host_ip: String,

    /// Path of the service list file.
    services_file: PathBuf,

    /// systemd unit directory override.
    #[serde(default)]
    unit_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug);

    info!("Starting noded");
    info!("Config file: {}", args.config);

    let content = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read config file {}", args.config))?;
    let config: NodeConfig =
        serde_yaml::from_str(&content).context("Failed to parse node configuration")?;

    let controller = match config.unit_dir {
        Some(ref unit_dir) => SystemdController::with_paths("/usr/bin/systemctl", unit_dir),
        None => SystemdController::new(),
    };

    match args.command.unwrap_or(Command::Run) {
        Command::Bootstrap => {
            bootstrap_coordination_store(&config.services_file, &controller)
                .await
                .map_err(|e| anyhow::anyhow!("Bootstrap failed: {}", e))?;
            info!("Bootstrap complete");
            Ok(())
        }
        Command::Run => run(config, controller).await,
    }
}

async fn run(config: NodeConfig, controller: SystemdController) -> Result<()> {
    // Seed health probes from the same service list the manager loads.
    let services = load_services_from_file(&config.services_file)
        .map_err(|e| anyhow::anyhow!("Failed to load services: {}", e))?;

    let evaluator = Arc::new(ProbeEvaluator::new());
    for service in &services {
        if let Some(ref health) = service.health {
            evaluator.register(&service.name, health.clone());
        }
    }
    evaluator.start();

    let cluster = Arc::new(MemoryClusterClient::new(config.host_ip));

    let mut manager = Manager::new(
        ManagerConfig {
            services_file: config.services_file,
        },
        Arc::new(controller),
        cluster,
        Arc::clone(&evaluator) as Arc<dyn noded_health::HealthEvaluator>,
    );

    if let Err(e) = manager.start().await {
        error!("Failed to bring node online: {}", e);
        return Err(anyhow::anyhow!("Start failed: {}", e));
    }
    info!("Node online, supervising {} services", manager.services().len());

    wait_for_shutdown_signal().await;

    info!("Taking node offline...");
    if let Err(e) = manager.offline().await {
        error!("Offline reported an error: {}", e);
    }
    evaluator.stop();
    manager.stop();
    info!("noded shut down");

    Ok(())
}

fn initialize_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to create SIGTERM handler");
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("Failed to create SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}
