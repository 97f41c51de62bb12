//! Daily retention sweep.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

use tally_core::config::cleanup::CleanupConfig;
use tally_core::error::AppError;
use tally_entity::audit::Actor;
use tally_service::LifecycleController;

use crate::executor::{JobExecutionError, ScheduledJob};

/// Deletes records past the retention window through the lifecycle
/// controller, attributed to the system actor.
#[derive(Debug)]
pub struct RetentionJob {
    /// Deletion path shared with the API.
    lifecycle: LifecycleController,
    /// Retention policy and schedule.
    config: CleanupConfig,
    /// Held while a sweep runs so ticks never overlap.
    running: Mutex<()>,
}

impl RetentionJob {
    /// Create a new retention job.
    pub fn new(lifecycle: LifecycleController, config: CleanupConfig) -> Self {
        Self {
            lifecycle,
            config,
            running: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ScheduledJob for RetentionJob {
    fn name(&self) -> &str {
        "retention_sweep"
    }

    fn schedule(&self) -> String {
        self.config.cron_expression()
    }

    async fn run(&self) -> Result<Value, JobExecutionError> {
        let _running = self
            .running
            .try_lock()
            .map_err(|_| JobExecutionError::Overlap(self.name().to_string()))?;

        info!(retention_days = self.config.retention_days, "Running retention sweep");
        let result = self
            .lifecycle
            .run_cleanup(self.config.retention_days, Actor::System)
            .await?;

        Ok(serde_json::to_value(result).map_err(AppError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use tally_core::traits::FixedClock;
    use tally_core::types::id::PrincipalId;
    use tally_database::MemoryFileRecordRepository;
    use tally_service::{AuditTrail, ClaimRegistry, LifecycleSettings, Upload};
    use tally_storage::MemoryStorageProvider;

    #[tokio::test]
    async fn test_run_sweeps_as_system() {
        let files = Arc::new(MemoryFileRecordRepository::new());
        let audit = files.audit_log();
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let lifecycle = LifecycleController::new(
            files.clone(),
            Arc::new(MemoryStorageProvider::new()),
            AuditTrail::new(clock.clone()),
            ClaimRegistry::new(),
            clock.clone(),
            LifecycleSettings::default(),
        );
        lifecycle
            .ingest(Upload::new(PrincipalId::new(), "a.xlsx", None, &b"PK\x03\x04"[..]))
            .await
            .unwrap();
        clock.advance(Duration::days(5));

        let job = RetentionJob::new(lifecycle, CleanupConfig::default());
        assert_eq!(job.schedule(), "0 0 3 * * *");

        let details = job.run().await.unwrap();
        assert_eq!(details["deletedRecords"], 1);
        assert_eq!(details["deletedPhysicalFiles"], 1);

        let entries = audit.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, "system");
    }
}
