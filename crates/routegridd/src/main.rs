//! routegridd — the RouteGrid daemon.
//!
//! Assembles the RouteGrid subsystems in one process:
//! - Policy store and name-service queue (redb)
//! - Zone config-server client
//! - Routing policy maintainer
//! - Name-service dispatcher
//!
//! # Usage
//!
//! ```text
//! routegridd run --config /etc/routegrid/routegrid.toml --data-dir /var/lib/routegrid
//! routegridd once --config routegrid.toml
//! routegridd policies --data-dir /var/lib/routegrid
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use routegrid_core::RoutegridConfig;
use routegrid_dns::{MemoryNameService, NameService, NameServiceDispatcher, QueueForwarder};
use routegrid_lb::{ConfigServerClient, ZoneRegistry};
use routegrid_maintainer::RoutingPolicyMaintainer;
use routegrid_state::StateStore;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,routegrid=debug,routegridd=debug";

/// Timeout of one config-server load balancer query.
const CONFIG_SERVER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "routegridd", about = "RouteGrid DNS routing daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the maintainer and dispatcher until interrupted.
    Run {
        /// Path to routegrid.toml.
        #[arg(long, default_value = "routegrid.toml")]
        config: PathBuf,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/routegrid")]
        data_dir: PathBuf,
    },
    /// Run a single maintenance tick and one dispatch batch, then exit.
    Once {
        #[arg(long, default_value = "routegrid.toml")]
        config: PathBuf,

        #[arg(long, default_value = "/var/lib/routegrid")]
        data_dir: PathBuf,
    },
    /// Print the stored routing policies as JSON.
    Policies {
        #[arg(long, default_value = "/var/lib/routegrid")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run { config, data_dir } => run(&config, &data_dir).await,
        Command::Once { config, data_dir } => once(&config, &data_dir).await,
        Command::Policies { data_dir } => print_policies(&data_dir),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Everything a maintenance process needs, built from configuration.
struct Daemon {
    config: RoutegridConfig,
    store: StateStore,
    maintainer: RoutingPolicyMaintainer,
    dispatcher: NameServiceDispatcher,
}

impl Daemon {
    fn assemble(config_path: &Path, data_dir: &Path) -> anyhow::Result<Self> {
        let config = RoutegridConfig::from_file(config_path)?;
        let store = open_store(data_dir)?.with_lock_timeout(config.maintainer.lock_timeout()?);

        let zones = ZoneRegistry::from_config(&config.zones);
        if zones.zones().is_empty() {
            warn!("no controller-upgraded zones configured, nothing will be routed");
        }

        let forwarder = Arc::new(QueueForwarder::new(
            store.clone(),
            config.name_service.max_queued_requests,
        ));
        let source = Arc::new(ConfigServerClient::from_config(&config.zones, CONFIG_SERVER_TIMEOUT));
        let maintainer = RoutingPolicyMaintainer::new(store.clone(), forwarder, source, zones, config.system);

        // No external provider is wired in; records are applied in-process.
        let name_service: Arc<dyn NameService> = Arc::new(MemoryNameService::new());
        let dispatcher = NameServiceDispatcher::new(
            store.clone(),
            name_service,
            config.name_service.dispatch_batch_size,
        );

        Ok(Self {
            config,
            store,
            maintainer,
            dispatcher,
        })
    }
}

fn open_store(data_dir: &Path) -> anyhow::Result<StateStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let db_path = data_dir.join("routegrid.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");
    Ok(store)
}

async fn run(config_path: &Path, data_dir: &Path) -> anyhow::Result<()> {
    info!("RouteGrid daemon starting");
    let daemon = Daemon::assemble(config_path, data_dir)?;
    let interval = daemon.config.maintainer.interval()?;
    let dispatch_interval = daemon.config.name_service.dispatch_interval()?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintainer_shutdown = shutdown_rx.clone();
    let dispatcher_shutdown = shutdown_rx;

    // ── Start background tasks ─────────────────────────────────

    let Daemon {
        maintainer,
        dispatcher,
        ..
    } = daemon;

    let maintainer_handle = tokio::spawn(async move {
        maintainer.run(interval, maintainer_shutdown).await;
    });

    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatch_interval, dispatcher_shutdown).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("installing Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = maintainer_handle.await;
    let _ = dispatcher_handle.await;

    info!("RouteGrid daemon stopped");
    Ok(())
}

async fn once(config_path: &Path, data_dir: &Path) -> anyhow::Result<()> {
    let daemon = Daemon::assemble(config_path, data_dir)?;
    let stats = daemon.maintainer.maintain().await;
    let dispatched = daemon.dispatcher.dispatch_batch().await?;
    let queued = daemon.store.name_service_queue_len()?;

    info!(dispatched, queued, "single maintenance run complete");
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn print_policies(data_dir: &Path) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let policies = store.read_all_routing_policies()?;
    println!("{}", serde_json::to_string_pretty(&policies)?);
    Ok(())
}
