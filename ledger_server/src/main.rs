//! Wallet ledger HTTP server.
//!
//! Serves the wallet API over a PostgreSQL or in-memory store.

use std::sync::Arc;

use anyhow::Error;
use ledger_server::{
    api,
    config::{ConfigOverrides, ServerConfig, StorageBackend},
    logging, metrics,
};
use pico_args::Arguments;
use tracing::info;
use wallet_ledger::{
    InMemoryWalletStore, OperationProcessor, PgWalletStore, WalletStore, db::Database,
};

const HELP: &str = "\
Run the wallet ledger server

USAGE:
  ledger_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8000]
  --db-url        URL      Database connection string  [default: env DATABASE_URL]
  --storage       BACKEND  postgres or memory          [default: env STORAGE_BACKEND or postgres]
  --metrics-bind  IP:PORT  Prometheus exporter address [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8000)
  STORAGE_BACKEND          postgres or memory
  DATABASE_URL             PostgreSQL connection string
  DB_MAX_CONNECTIONS       Pool size
  RUN_MIGRATIONS           Apply migrations on startup (default true)
  METRICS_BIND             Prometheus exporter address
  RUST_LOG                 Log filter (default info,sqlx=warn,hyper=warn)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let overrides = ConfigOverrides {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        storage: pargs.opt_value_from_str::<_, StorageBackend>("--storage")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}\n\n{HELP}");
    }

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;
    info!(
        bind = %config.bind,
        storage = %config.storage,
        "Starting wallet ledger server"
    );

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics available at http://{}/metrics", metrics_bind);
    }

    let (store, database): (Arc<dyn WalletStore>, Option<Database>) = match config.storage {
        StorageBackend::Postgres => {
            info!("Connecting to database");
            let db = Database::new(&config.database)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

            if config.run_migrations {
                db.migrate()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to apply migrations: {}", e))?;
            }
            info!("Database connected successfully");

            let store = PgWalletStore::new(Arc::new(db.pool().clone()));
            (Arc::new(store), Some(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on shutdown");
            (Arc::new(InMemoryWalletStore::new()), None)
        }
    };

    let state = api::AppState {
        processor: Arc::new(OperationProcessor::new(store)),
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
