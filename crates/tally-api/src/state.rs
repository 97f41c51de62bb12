//! Application state shared across all handlers.

use std::sync::Arc;

use tally_core::config::AppConfig;
use tally_core::traits::{Clock, StorageProvider};
use tally_database::DatabasePool;
use tally_database::repositories::FileRecordRepository;
use tally_service::{
    AdminFileService, AuditTrail, ClaimRegistry, FileQueryService, LifecycleController,
    LifecycleSettings,
};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Artifact storage
    pub storage: Arc<dyn StorageProvider>,
    /// PostgreSQL pool; `None` when running on in-memory repositories
    pub database: Option<DatabasePool>,
    /// Ingestion, processing, deletion, retention
    pub lifecycle: Arc<LifecycleController>,
    /// History, preview, download
    pub queries: Arc<FileQueryService>,
    /// Administrative console
    pub admin: Arc<AdminFileService>,
}

impl AppState {
    /// Wire the services over the given repositories and storage.
    pub fn new(
        config: AppConfig,
        files: Arc<dyn FileRecordRepository>,
        storage: Arc<dyn StorageProvider>,
        clock: Arc<dyn Clock>,
        database: Option<DatabasePool>,
    ) -> Self {
        let audit = AuditTrail::new(Arc::clone(&clock));
        let lifecycle = LifecycleController::new(
            Arc::clone(&files),
            Arc::clone(&storage),
            audit.clone(),
            ClaimRegistry::new(),
            Arc::clone(&clock),
            LifecycleSettings::from_config(&config.storage, &config.processing),
        );
        let queries = FileQueryService::new(
            Arc::clone(&files),
            Arc::clone(&storage),
            &config.processing,
        );
        let admin = AdminFileService::new(
            files,
            lifecycle.clone(),
            audit,
            clock,
            config.cleanup.clone(),
        );

        Self {
            config: Arc::new(config),
            storage,
            database,
            lifecycle: Arc::new(lifecycle),
            queries: Arc::new(queries),
            admin: Arc::new(admin),
        }
    }
}
