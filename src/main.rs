//! Bank Ledger service
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │  Config  │───▶│  Store   │───▶│ Executor │───▶│ Gateway  │
//! │  (YAML)  │    │(PG / mem)│    │(transfer)│    │  (HTTP)  │
//! └──────────┘    └──────────┘    └──────────┘    └──────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use bank_ledger::config::{AppConfig, StoreBackend};
use bank_ledger::gateway::{self, AppState};
use bank_ledger::logging::init_logging;
use bank_ledger::store::{LedgerStore, MemoryStore, PgStore};

#[derive(Parser, Debug)]
#[command(name = "bank_ledger", version = env!("BUILD_VERSION"), about = "Bank ledger HTTP service")]
struct Cli {
    /// Config environment, loads config/{env}.yaml
    #[arg(short, long, default_value = "dev", env = "LEDGER_ENV")]
    env: String,

    /// Override server.port
    #[arg(long)]
    port: Option<u16>,

    /// Create tables and indexes before serving (PostgreSQL only)
    #[arg(long)]
    init_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut app_config = AppConfig::load(&cli.env)?;
    if let Some(port) = cli.port {
        app_config.server.port = port;
    }
    let _log_guard = init_logging(&app_config);

    tracing::info!(
        env = %cli.env,
        build = env!("BUILD_VERSION"),
        store = ?app_config.store,
        "Starting bank ledger"
    );

    let store: Arc<dyn LedgerStore> = match app_config.store {
        StoreBackend::Postgres => {
            let pg = PgStore::connect(&app_config.database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            if cli.init_schema || app_config.database.init_schema {
                pg.init_schema().await.context("Failed to initialize schema")?;
            }
            Arc::new(pg)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory ledger store, data is lost on exit");
            Arc::new(MemoryStore::with_lock_timeout(
                std::time::Duration::from_millis(app_config.database.lock_timeout_ms),
            ))
        }
    };

    let state = Arc::new(AppState::new(store, &app_config.transfer));
    tracing::info!(
        policy = ?state.executor.policy(),
        max_attempts = state.retry.max_attempts,
        "Transfer executor ready"
    );

    gateway::run_server(&app_config.server, state).await
}
