//! Shared fixtures for the service tests.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeZone, Utc};

use tally_aggregate::{Cell, Table, workbook};
use tally_core::config::cleanup::CleanupConfig;
use tally_core::config::processing::ProcessingConfig;
use tally_core::traits::FixedClock;
use tally_core::types::id::PrincipalId;
use tally_database::{MemoryAuditLog, MemoryFileRecordRepository};
use tally_entity::audit::AuditLogEntry;
use tally_entity::file::FileRecord;
use tally_storage::MemoryStorageProvider;

use crate::admin::AdminFileService;
use crate::audit::AuditTrail;
use crate::claim::ClaimRegistry;
use crate::file::{FileQueryService, LifecycleController, LifecycleSettings, Upload};

pub(crate) struct Harness {
    pub files: Arc<MemoryFileRecordRepository>,
    pub audit: MemoryAuditLog,
    pub storage: Arc<MemoryStorageProvider>,
    pub clock: Arc<FixedClock>,
    pub claims: ClaimRegistry,
    pub lifecycle: LifecycleController,
    pub queries: FileQueryService,
    pub admin: AdminFileService,
}

impl Harness {
    pub fn new() -> Self {
        let files = Arc::new(MemoryFileRecordRepository::new());
        let audit = files.audit_log();
        let storage = Arc::new(MemoryStorageProvider::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap(),
        ));
        let claims = ClaimRegistry::new();

        let trail = AuditTrail::new(clock.clone());
        let lifecycle = LifecycleController::new(
            files.clone(),
            storage.clone(),
            trail.clone(),
            claims.clone(),
            clock.clone(),
            LifecycleSettings::default(),
        );
        let queries = FileQueryService::new(
            files.clone(),
            storage.clone(),
            &ProcessingConfig::default(),
        );
        let admin = AdminFileService::new(
            files.clone(),
            lifecycle.clone(),
            trail,
            clock.clone(),
            CleanupConfig::default(),
        );

        Self {
            files,
            audit,
            storage,
            clock,
            claims,
            lifecycle,
            queries,
            admin,
        }
    }

    pub async fn upload(
        &self,
        owner: PrincipalId,
        name: &str,
        data: impl Into<Bytes>,
    ) -> FileRecord {
        self.lifecycle
            .ingest(Upload::new(owner, name, None, data))
            .await
            .unwrap()
    }

    pub async fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.audit.entries().await
    }
}

pub(crate) fn workbook_bytes(columns: &[&str], rows: Vec<Vec<Cell>>) -> Vec<u8> {
    let table = Table::new(columns.iter().map(|c| c.to_string()).collect(), rows);
    workbook::write_table(&table).unwrap()
}

/// `[rate, period, qty]` with two periods.
pub(crate) fn ledger_workbook() -> Vec<u8> {
    workbook_bytes(
        &["rate", "period", "qty"],
        vec![
            vec![Cell::Text("17%".into()), Cell::Text("202501".into()), Cell::Number(5.0)],
            vec![Cell::Text("16%".into()), Cell::Text("202501".into()), Cell::Number(3.0)],
            vec![Cell::Text("13%".into()), Cell::Text("202502".into()), Cell::Number(2.0)],
        ],
    )
}
