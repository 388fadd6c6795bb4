//! # evote-api: Binary Entry Point
//!
//! `evote-api serve` (the default) starts the HTTP server.
//! `evote-api gen-salt` prints a fresh random value for `EVOTE_VOTER_SALT`.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rand_core::{OsRng, RngCore};
use tracing_subscriber::EnvFilter;

use evote_api::config::AppConfig;
use evote_api::db::receipts::PgReceiptStore;
use evote_api::state::AppState;
use evote_receipt::{MemoryReceiptStore, ReceiptSalt, ReceiptService, ReceiptStore};

const LOG_FORMAT_ENV_VAR: &str = "EVOTE_LOG_FORMAT";
const GENERATED_SALT_BYTES: usize = 32;

/// evote API server
#[derive(Parser, Debug)]
#[command(name = "evote-api", version, about, long_about = None)]
struct Cli {
    /// Log output format. Falls back to EVOTE_LOG_FORMAT, then text.
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default).
    Serve {
        /// Listen port. Overrides EVOTE_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a random hex salt suitable for EVOTE_VOTER_SALT.
    GenSalt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_format = cli.log_format.unwrap_or_else(|| {
        std::env::var(LOG_FORMAT_ENV_VAR)
            .ok()
            .and_then(|v| LogFormat::from_str(v.trim(), true).ok())
            .unwrap_or(LogFormat::Text)
    });

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::GenSalt => {
            let mut bytes = [0u8; GENERATED_SALT_BYTES];
            OsRng.fill_bytes(&mut bytes);
            println!("{}", hex::encode(bytes));
            Ok(())
        }
        Commands::Serve { port } => {
            init_tracing(log_format);
            serve(port).await
        }
    }
}

async fn serve(port_override: Option<u16>) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = port_override {
        config.port = port;
    }
    if config.auth_token.is_none() {
        tracing::warn!("EVOTE_ADMIN_TOKEN not set, admin endpoints are unauthenticated");
    }

    // No default: refuse to start without a proper salt.
    let salt = ReceiptSalt::from_env().context("voter-identity salt is not configured")?;

    let db_pool = evote_api::db::init_pool()
        .await
        .context("database initialization failed")?;

    let store: Arc<dyn ReceiptStore> = match &db_pool {
        Some(pool) => Arc::new(PgReceiptStore::new(pool.clone())),
        None => Arc::new(MemoryReceiptStore::new()),
    };
    let receipts = ReceiptService::new(store, salt);
    let port = config.port;
    let state = AppState::with_config(config, receipts, db_pool);

    state
        .hydrate_from_db()
        .await
        .context("database hydration failed")?;

    let app = evote_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("evote API listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
