//! Administrative operations over every principal's files.

use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use tally_core::config::cleanup::CleanupConfig;
use tally_core::error::{AppError, codes};
use tally_core::result::AppResult;
use tally_core::traits::Clock;
use tally_core::types::id::FileId;
use tally_core::types::pagination::{PageRequest, PageResponse};
use tally_database::repositories::{FileFilter, FileRecordRepository};
use tally_entity::audit::{CreateAuditLogEntry, actions};
use tally_entity::file::model::MAX_REMARK_LEN;
use tally_entity::file::{FileRecord, FileStatus, Transition};

use crate::audit::AuditTrail;
use crate::context::Principal;
use crate::file::{BatchDeleteResult, CleanupResult, DeletedFile, LifecycleController};

/// Window for the dashboard's recent-uploads counter.
const RECENT_UPLOAD_DAYS: i64 = 7;

/// Fields an administrator may change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRecord {
    /// New remark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// Status override, restricted by the transition table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FileStatus>,
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    /// Number of records.
    pub total_files: u64,
    /// Bytes across all artifacts.
    pub total_storage_bytes: u64,
    /// Records uploaded in the last seven days.
    pub uploads_last7_days: u64,
}

/// The retention policy as shown to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSettings {
    /// Records older than this many days are swept.
    pub retention_days: u32,
    /// Hour of the daily sweep.
    pub schedule_hour: u32,
    /// Minute of the daily sweep.
    pub schedule_minute: u32,
}

/// File console for administrators.
///
/// Every method checks the caller's role first.
#[derive(Debug, Clone)]
pub struct AdminFileService {
    files: Arc<dyn FileRecordRepository>,
    lifecycle: LifecycleController,
    audit: AuditTrail,
    clock: Arc<dyn Clock>,
    cleanup: CleanupConfig,
}

impl AdminFileService {
    /// Creates a new admin file service.
    pub fn new(
        files: Arc<dyn FileRecordRepository>,
        lifecycle: LifecycleController,
        audit: AuditTrail,
        clock: Arc<dyn Clock>,
        cleanup: CleanupConfig,
    ) -> Self {
        Self {
            files,
            lifecycle,
            audit,
            clock,
            cleanup,
        }
    }

    /// List records across all owners.
    pub async fn list(
        &self,
        ctx: &Principal,
        filter: &FileFilter,
        page: PageRequest,
    ) -> AppResult<PageResponse<FileRecord>> {
        ctx.require_admin()?;
        self.files.list(filter, page).await
    }

    /// Get one record.
    pub async fn detail(&self, ctx: &Principal, id: FileId) -> AppResult<FileRecord> {
        ctx.require_admin()?;
        self.find(id).await
    }

    /// Change a record's remark and/or status.
    pub async fn update(
        &self,
        ctx: &Principal,
        id: FileId,
        changes: UpdateFileRecord,
    ) -> AppResult<FileRecord> {
        ctx.require_admin()?;

        if changes.remark.is_none() && changes.status.is_none() {
            return Err(AppError::validation("Nothing to update"));
        }
        if let Some(remark) = &changes.remark {
            if remark.chars().count() > MAX_REMARK_LEN {
                return Err(AppError::validation(format!(
                    "remark must be at most {MAX_REMARK_LEN} characters"
                )));
            }
        }

        let current = self.find(id).await?;
        if let Some(target) = changes.status {
            if !current.status.can(Transition::Override(target)) {
                return Err(AppError::conflict(format!(
                    "Cannot change status from {} to {target}",
                    current.status
                ))
                .with_code(codes::INVALID_TRANSITION));
            }
        }

        let _claim = self.lifecycle.claim(id)?;
        let mut tx = self.files.begin().await?;
        let updated = tx
            .update_admin_fields(id, current.status, changes.remark.clone(), changes.status)
            .await?
            .ok_or_else(|| {
                AppError::conflict(format!("File {id} changed concurrently"))
                    .with_code(codes::INVALID_TRANSITION)
            })?;
        self.audit
            .record(
                tx.as_mut(),
                CreateAuditLogEntry::file(
                    ctx.actor(),
                    actions::UPDATE_FILE,
                    id,
                    serde_json::to_value(&changes)?,
                ),
            )
            .await?;
        tx.commit().await?;

        info!(file_id = %id, admin_id = %ctx.id, status = %updated.status, "File updated by admin");
        Ok(updated)
    }

    /// Delete one record.
    pub async fn delete(&self, ctx: &Principal, id: FileId) -> AppResult<DeletedFile> {
        ctx.require_admin()?;
        self.lifecycle.delete_any(id, ctx.actor()).await
    }

    /// Delete several records.
    pub async fn batch_delete(&self, ctx: &Principal, ids: &[FileId]) -> AppResult<BatchDeleteResult> {
        ctx.require_admin()?;
        if ids.is_empty() {
            return Err(AppError::validation("fileIds must not be empty"));
        }
        self.lifecycle.delete_many(ids, ctx.actor()).await
    }

    /// Dashboard counters.
    pub async fn stats(&self, ctx: &Principal) -> AppResult<AdminStats> {
        ctx.require_admin()?;
        let since = self.clock.now() - Duration::days(RECENT_UPLOAD_DAYS);
        let stats = self.files.stats(since).await?;
        Ok(AdminStats {
            total_files: stats.total_files,
            total_storage_bytes: stats.total_storage_bytes,
            uploads_last7_days: stats.uploads_since,
        })
    }

    /// The configured retention policy.
    pub fn cleanup_settings(&self, ctx: &Principal) -> AppResult<CleanupSettings> {
        ctx.require_admin()?;
        Ok(CleanupSettings {
            retention_days: self.cleanup.retention_days,
            schedule_hour: self.cleanup.schedule_hour,
            schedule_minute: self.cleanup.schedule_minute,
        })
    }

    /// Run a retention sweep now.
    pub async fn run_cleanup(&self, ctx: &Principal) -> AppResult<CleanupResult> {
        ctx.require_admin()?;
        self.lifecycle
            .run_cleanup(self.cleanup.retention_days, ctx.actor())
            .await
    }

    async fn find(&self, id: FileId) -> AppResult<FileRecord> {
        self.files
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, ledger_workbook};
    use tally_core::error::ErrorKind;
    use tally_core::types::id::PrincipalId;

    fn admin() -> Principal {
        Principal::admin(PrincipalId::new())
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let h = Harness::new();
        let user = Principal::user(PrincipalId::new());

        let err = h.admin.stats(&user).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        let err = h.admin.cleanup_settings(&user).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_update_remark_and_override_status() {
        let h = Harness::new();
        let ctx = admin();
        let record = h.upload(PrincipalId::new(), "a.xlsx", ledger_workbook()).await;

        let updated = h
            .admin
            .update(
                &ctx,
                record.id,
                UpdateFileRecord {
                    remark: Some("checked".into()),
                    status: Some(FileStatus::Failed),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.remark, "checked");
        assert_eq!(updated.status, FileStatus::Failed);

        let entries = h.audit_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, actions::UPDATE_FILE);
        assert_eq!(entries[0].actor, ctx.id.to_string());
        assert_eq!(
            entries[0].details,
            serde_json::json!({ "remark": "checked", "status": "failed" })
        );
    }

    #[tokio::test]
    async fn test_failed_audit_append_leaves_record_unchanged() {
        let h = Harness::new();
        let ctx = admin();
        let record = h.upload(PrincipalId::new(), "a.xlsx", ledger_workbook()).await;
        h.audit.fail_appends(true);

        let err = h
            .admin
            .update(
                &ctx,
                record.id,
                UpdateFileRecord {
                    remark: Some("checked".into()),
                    status: Some(FileStatus::Failed),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Database);

        let stored = h.files.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert!(h.audit_entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_forbidden_override() {
        let h = Harness::new();
        let ctx = admin();
        let record = h.upload(PrincipalId::new(), "a.xlsx", ledger_workbook()).await;

        let err = h
            .admin
            .update(
                &ctx,
                record.id,
                UpdateFileRecord {
                    remark: None,
                    status: Some(FileStatus::Processing),
                },
            )
            .await
            .unwrap_err();
        assert!(err.has_code(codes::INVALID_TRANSITION));
        assert!(h.audit_entries().await.is_empty());

        let err = h
            .admin
            .update(
                &ctx,
                record.id,
                UpdateFileRecord {
                    remark: Some("x".repeat(MAX_REMARK_LEN + 1)),
                    status: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_batch_delete_skips_unknown_ids() {
        let h = Harness::new();
        let ctx = admin();
        let a = h.upload(PrincipalId::new(), "a.xlsx", ledger_workbook()).await;
        let b = h.upload(PrincipalId::new(), "b.xlsx", ledger_workbook()).await;

        let result = h
            .admin
            .batch_delete(&ctx, &[a.id, b.id, FileId::new(), a.id])
            .await
            .unwrap();

        assert_eq!(result, BatchDeleteResult { deleted: 2, skipped: 1 });
        let entries = h.audit_entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].details["deleted"], 2);

        let err = h.admin.batch_delete(&ctx, &[]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_stats_count_recent_uploads() {
        let h = Harness::new();
        let ctx = admin();
        let old = h.upload(PrincipalId::new(), "old.xlsx", ledger_workbook()).await;
        h.clock.advance(Duration::days(8));
        let recent = h.upload(PrincipalId::new(), "new.xlsx", ledger_workbook()).await;

        let stats = h.admin.stats(&ctx).await.unwrap();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.uploads_last7_days, 1);
        assert_eq!(stats.total_storage_bytes, (old.size_bytes + recent.size_bytes) as u64);
    }

    #[tokio::test]
    async fn test_on_demand_cleanup_is_attributed_to_admin() {
        let h = Harness::new();
        let ctx = admin();
        h.upload(PrincipalId::new(), "a.xlsx", ledger_workbook()).await;
        h.clock.advance(Duration::days(4));

        let settings = h.admin.cleanup_settings(&ctx).unwrap();
        assert_eq!(settings.retention_days, 3);

        let result = h.admin.run_cleanup(&ctx).await.unwrap();
        assert_eq!(result.deleted_records, 1);
        let entries = h.audit_entries().await;
        assert_eq!(entries[0].actor, ctx.id.to_string());
        assert_eq!(entries[0].action, actions::RUN_CLEANUP);
    }
}
