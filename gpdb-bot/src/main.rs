//! gpdb-bot - Gameplay Database command service
//!
//! Serves the registry commands over HTTP, runs the single write queue and
//! the periodic reconciliation and backup triggers.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use gpdb_common::config::{ResolvedConfig, TomlConfig};
use gpdb_common::{Store, WriteQueue};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gpdb_bot::auth::ModeratorWhitelist;
use gpdb_bot::metadata::MetadataClient;
use gpdb_bot::scheduler::Triggers;
use gpdb_bot::{build_router, AppState};

/// Command-line arguments for gpdb-bot
#[derive(Parser, Debug)]
#[command(name = "gpdb-bot")]
#[command(about = "Gameplay Database command service")]
#[command(version)]
struct Args {
    /// Bootstrap configuration file
    #[arg(short, long, default_value = "gpdb.toml", env = "GPDB_CONFIG")]
    config: PathBuf,

    /// Root folder holding the database, saves and whitelist
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before logging exists; a missing file is reported below
    let config_found = args.config.exists();
    let toml_config = TomlConfig::load(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    let mut config = toml_config.resolve(args.root_folder.as_deref());
    if let Some(port) = args.port {
        config.port = port;
    }

    config
        .ensure_directories()
        .context("Failed to create data directories")?;
    init_tracing(&config)?;

    info!("Starting gpdb-bot v{}", env!("CARGO_PKG_VERSION"));
    if !config_found {
        warn!(
            "Config file {} not found, using built-in defaults",
            args.config.display()
        );
    }
    info!("Root folder: {}", config.root_folder.display());
    info!("Database path: {}", config.database_path.display());

    let store = Store::open(&config.database_path)
        .await
        .context("Failed to open database")?;
    info!("✓ Database ready");

    let (queue, worker) = WriteQueue::spawn(store.clone());

    let metadata = MetadataClient::new(config.youtube_api_key.clone())
        .context("Failed to build metadata client")?;
    if !metadata.has_api_key() {
        warn!("No YouTube API key configured, channel avatars disabled");
    }

    let triggers = Triggers::start(
        store.clone(),
        queue.clone(),
        config.saves_dir.clone(),
        config.sync_interval,
        config.backup_interval,
    );

    let state = AppState::new(
        store,
        queue.clone(),
        ModeratorWhitelist::new(&config.whitelist_path),
        metadata,
        config.saves_dir.clone(),
    );
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("gpdb-bot listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    triggers.abort();

    // Let already-submitted writes land before exiting
    let pending = queue.stats().pending();
    if pending > 0 {
        info!(pending, "Draining write queue");
    }
    if let Err(e) = queue.flush().await {
        error!(error = %e, "Write queue did not drain");
    }
    drop(queue);
    let _ = worker.await;

    info!("Server shutdown complete");
    Ok(())
}

/// Console logging plus a plain-text copy in the log file
fn init_tracing(config: &ResolvedConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
