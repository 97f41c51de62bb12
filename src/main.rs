//! Tally server: spreadsheet ingestion and accounting-period aggregation.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use tally_api::{AppState, build_app};
use tally_core::config::AppConfig;
use tally_core::error::AppError;
use tally_core::traits::{Clock, StorageProvider, SystemClock};
use tally_database::repositories::FileRecordRepository;
use tally_database::{DatabasePool, MemoryFileRecordRepository, PgFileRecordRepository};
use tally_storage::LocalStorageProvider;
use tally_worker::{CronScheduler, RetentionJob};

#[tokio::main]
async fn main() {
    let env = std::env::var("TALLY_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Tally v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Repositories ─────────────────────────────────────
    let (database, files) = open_repositories(&config).await?;

    // ── Step 2: Storage ──────────────────────────────────────────
    let storage: Arc<dyn StorageProvider> =
        Arc::new(LocalStorageProvider::new(&config.storage.root_path).await?);
    tracing::info!(root = %config.storage.root_path, "Local storage ready");

    // ── Step 3: Services ─────────────────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState::new(
        config.clone(),
        files,
        storage,
        clock,
        database.clone(),
    );
    state.lifecycle.recover_interrupted().await?;

    // ── Step 4: Retention schedule ───────────────────────────────
    let mut scheduler = if config.cleanup.enabled {
        let scheduler = CronScheduler::new().await?;
        scheduler
            .register(Arc::new(RetentionJob::new(
                state.lifecycle.as_ref().clone(),
                config.cleanup.clone(),
            )))
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Scheduled cleanup disabled");
        None
    };

    // ── Step 5: HTTP server ──────────────────────────────────────
    let app = build_app(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Tally server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 6: Drain ────────────────────────────────────────────
    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }
    if let Some(database) = database {
        let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
        if tokio::time::timeout(grace, database.close()).await.is_err() {
            tracing::warn!("Database pool did not close within the grace period");
        }
    }

    tracing::info!("Tally server stopped");
    Ok(())
}

type Repositories = (Option<DatabasePool>, Arc<dyn FileRecordRepository>);

/// PostgreSQL when `database.url` is set, otherwise in-memory repositories.
async fn open_repositories(config: &AppConfig) -> Result<Repositories, AppError> {
    if config.database.url.trim().is_empty() {
        tracing::warn!("database.url is empty; records are kept in memory and lost on exit");
        let files: Arc<dyn FileRecordRepository> = Arc::new(MemoryFileRecordRepository::new());
        return Ok((None, files));
    }

    let database = DatabasePool::connect(&config.database).await?;
    tracing::info!("Running database migrations...");
    tally_database::migration::run_migrations(database.pool()).await?;

    let files: Arc<dyn FileRecordRepository> =
        Arc::new(PgFileRecordRepository::new(database.pool().clone()));
    Ok((Some(database), files))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
