//! festd — the festgrid daemon.
//!
//! Single binary that assembles the festgrid subsystems:
//! - State store (redb)
//! - Scheduler (sub-event rounds and whole-event placement)
//! - Optional periodic placement of upcoming events
//! - REST API
//!
//! # Usage
//!
//! ```text
//! festd standalone --port 8443 --data-dir /var/lib/festgrid --config fest.toml
//! festd config --config fest.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fest_core::FestConfig;
use festgrid_scheduler::Scheduler;
use tokio::sync::watch;
use tracing::{info, warn};

const DEFAULT_DATA_DIR: &str = "/var/lib/festgrid";

#[derive(Parser)]
#[command(name = "festd", about = "festgrid scheduling daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the store, scheduler and API in one process.
    Standalone {
        /// Port to listen on. Overrides `server.port`.
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for persistent state. Overrides `server.data_dir`.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to fest.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds between placement runs over upcoming events; 0 disables.
        #[arg(long, default_value = "0")]
        optimize_interval: u64,
    },
    /// Validate a config file and print it.
    Config {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,festd=debug,festgrid=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            port,
            data_dir,
            config,
            optimize_interval,
        } => {
            let file = load_config(config.as_deref())?;
            let port = port.unwrap_or_else(|| file.port());
            let data_dir = data_dir
                .or_else(|| file.data_dir().map(Path::to_path_buf))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
            run_standalone(&file, port, data_dir, optimize_interval).await
        }
        Command::Config { config } => {
            let file = FestConfig::from_file(&config)?;
            print!("{}", file.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<FestConfig> {
    match path {
        Some(path) => {
            let config = FestConfig::from_file(path)?;
            info!(path = %path.display(), "config loaded");
            Ok(config)
        }
        None => Ok(FestConfig::default()),
    }
}

async fn run_standalone(
    file: &FestConfig,
    port: u16,
    data_dir: PathBuf,
    optimize_interval: u64,
) -> anyhow::Result<()> {
    info!("festgrid daemon starting in standalone mode");

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating {}", data_dir.display()))?;
    let db_path = data_dir.join("festgrid.redb");

    // ── Initialize subsystems ──────────────────────────────────

    let state = festgrid_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let scheduler_config = file.scheduler_config()?;
    info!(
        day_start = %scheduler_config.day_start,
        slot_minutes = scheduler_config.slot_width.num_minutes(),
        default_daily_hours = scheduler_config.default_daily_hours,
        "scheduler initialized"
    );
    let scheduler = Scheduler::new(state, scheduler_config);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let optimize_handle = (optimize_interval > 0).then(|| {
        let scheduler = scheduler.clone();
        let interval = Duration::from_secs(optimize_interval);
        info!(interval = optimize_interval, "event placement loop enabled");
        tokio::spawn(run_optimizer(scheduler, interval, shutdown_rx))
    });

    // ── Start API server ───────────────────────────────────────

    let router = festgrid_api::build_router(scheduler);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    if let Some(handle) = optimize_handle {
        let _ = handle.await;
    }

    info!("festgrid daemon stopped");
    Ok(())
}

/// Periodically place upcoming events until shutdown.
async fn run_optimizer(scheduler: Scheduler, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match scheduler.optimize_upcoming(chrono::Utc::now()).await {
                    Ok(placed) => info!(placed = placed.len(), "upcoming events placed"),
                    Err(e) => warn!(error = %e, "event placement failed"),
                }
            }
            _ = shutdown.changed() => {
                info!("event placement loop stopping");
                return;
            }
        }
    }
}
