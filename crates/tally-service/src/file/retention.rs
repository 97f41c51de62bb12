//! Retention sweep.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use tally_core::result::AppResult;
use tally_entity::audit::{Actor, CreateAuditLogEntry};

use super::lifecycle::{LifecycleController, PhysicalDelete};

/// Counters from one retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResult {
    /// Records removed.
    pub deleted_records: u64,
    /// Artifacts that existed and were removed.
    pub deleted_physical_files: u64,
    /// Artifacts whose removal failed.
    pub failed_physical_deletes: u64,
}

impl LifecycleController {
    /// Delete every record uploaded before `now - retention_days`.
    ///
    /// Records held by an in-flight operation are left for the next sweep.
    /// The row deletes and the single `run_cleanup` audit entry commit
    /// together; a repository failure rolls the whole sweep back.
    pub async fn expire(
        &self,
        now: DateTime<Utc>,
        retention_days: u32,
        actor: Actor,
    ) -> AppResult<CleanupResult> {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let expired = self.files.find_uploaded_before(cutoff).await?;
        let mut result = CleanupResult::default();
        let mut claims = Vec::with_capacity(expired.len());

        let mut tx = self.files.begin().await?;
        for record in expired {
            let Some(claim) = self.claims.try_claim(record.id) else {
                info!(file_id = %record.id, "Skipping record in flight");
                continue;
            };
            let Some(deleted) = tx.delete(record.id).await? else {
                debug!(file_id = %record.id, "Record vanished or started processing during sweep");
                continue;
            };
            claims.push(claim);
            result.deleted_records += 1;
            match self.delete_artifact(&deleted).await {
                PhysicalDelete::Removed => result.deleted_physical_files += 1,
                PhysicalDelete::Failed => result.failed_physical_deletes += 1,
                PhysicalDelete::Missing => {}
            }
        }

        self.audit
            .record(
                tx.as_mut(),
                CreateAuditLogEntry::cleanup(actor, serde_json::to_value(result)?),
            )
            .await?;
        tx.commit().await.inspect_err(|e| {
            error!(
                deleted_physical_files = result.deleted_physical_files,
                "Retention sweep failed to commit after removing artifacts: {e}"
            );
        })?;
        drop(claims);

        info!(
            actor = %actor,
            %cutoff,
            deleted_records = result.deleted_records,
            deleted_physical_files = result.deleted_physical_files,
            failed_physical_deletes = result.failed_physical_deletes,
            "Retention sweep finished"
        );
        Ok(result)
    }

    /// Run a sweep against the current time.
    pub async fn run_cleanup(&self, retention_days: u32, actor: Actor) -> AppResult<CleanupResult> {
        self.expire(self.clock.now(), retention_days, actor).await
    }
}
