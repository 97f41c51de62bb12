//! File lifecycle controller: ingestion, processing, and deletion.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use tally_aggregate::{Aggregation, AggregationSummary, Aggregator, SpreadsheetFormat, workbook};
use tally_core::config::processing::ProcessingConfig;
use tally_core::config::storage::StorageConfig;
use tally_core::error::{AppError, codes};
use tally_core::result::AppResult;
use tally_core::traits::{Clock, StorageProvider};
use tally_core::types::id::{FileId, PrincipalId};
use tally_database::repositories::{FileRecordRepository, FileTransaction};
use tally_entity::audit::{Actor, CreateAuditLogEntry, actions};
use tally_entity::file::{FileRecord, FileStatus, Transition};
use tally_storage::artifact_path;

use super::ingest::Upload;
use crate::audit::AuditTrail;
use crate::blocking::run_bounded;
use crate::claim::{ClaimGuard, ClaimRegistry};

/// Limits applied by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Largest accepted upload.
    pub max_upload_size_bytes: u64,
    /// Upper bound on one decode-aggregate-encode run.
    pub transform_timeout: Duration,
}

impl LifecycleSettings {
    /// Build settings from configuration sections.
    pub fn from_config(storage: &StorageConfig, processing: &ProcessingConfig) -> Self {
        Self {
            max_upload_size_bytes: storage.max_upload_size_bytes,
            transform_timeout: Duration::from_secs(processing.transform_timeout_seconds.max(1)),
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default(), &ProcessingConfig::default())
    }
}

/// Result of a successful processing run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    /// The original, back in `completed`.
    pub original: FileRecord,
    /// The new derived record.
    pub processed: FileRecord,
    /// Aggregation metadata.
    pub summary: AggregationSummary,
    /// Derived records from earlier runs that this run replaced.
    pub replaced: Vec<FileId>,
}

/// What happened to the artifact behind a deleted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalDelete {
    /// The artifact existed and was removed.
    Removed,
    /// There was nothing to remove.
    Missing,
    /// Removal failed; the artifact may still exist.
    Failed,
}

/// A deleted record and the fate of its artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFile {
    /// The row as it was before deletion.
    pub record: FileRecord,
    /// Outcome of the physical delete.
    pub physical: PhysicalDelete,
}

/// Counts from a multi-record delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResult {
    /// Records removed.
    pub deleted: u64,
    /// Requested ids that were missing or in flight.
    pub skipped: u64,
}

/// Owns every status transition of a [`FileRecord`].
///
/// All mutating paths take the per-record claim first, then apply a
/// conditional update in the repository, so a record is never processed
/// and deleted at the same time.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    /// File record repository.
    pub(crate) files: Arc<dyn FileRecordRepository>,
    /// Artifact storage.
    pub(crate) storage: Arc<dyn StorageProvider>,
    /// Audit writer.
    pub(crate) audit: AuditTrail,
    /// Per-record single-flight claims.
    pub(crate) claims: ClaimRegistry,
    /// Time source.
    pub(crate) clock: Arc<dyn Clock>,
    /// The aggregation engine.
    aggregator: Arc<Aggregator>,
    /// Limits.
    settings: LifecycleSettings,
}

impl LifecycleController {
    /// Creates a new lifecycle controller.
    pub fn new(
        files: Arc<dyn FileRecordRepository>,
        storage: Arc<dyn StorageProvider>,
        audit: AuditTrail,
        claims: ClaimRegistry,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            files,
            storage,
            audit,
            claims,
            clock,
            aggregator: Arc::new(Aggregator::default()),
            settings,
        }
    }

    /// Replace the aggregation engine.
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = Arc::new(aggregator);
        self
    }

    /// The controller's limits.
    pub fn settings(&self) -> LifecycleSettings {
        self.settings
    }

    /// Store an upload and create its `completed` original record.
    pub async fn ingest(&self, upload: Upload) -> AppResult<FileRecord> {
        let format = upload.validate(self.settings.max_upload_size_bytes)?;

        let id = FileId::new();
        let now = self.clock.now();
        let location = artifact_path(id, format.extension(), now);
        let size = upload.data.len() as i64;

        self.storage.write(&location, upload.data.clone()).await?;

        let record = FileRecord::new_original(
            id,
            upload.owner_id,
            upload.display_name(id, format),
            location,
            size,
            now,
        );
        if let Err(e) = self.files.insert(&record).await {
            self.discard_artifact(&record.storage_location).await;
            return Err(e);
        }

        info!(
            file_id = %record.id,
            owner_id = %record.owner_id,
            format = %format,
            size,
            "File uploaded"
        );
        Ok(record)
    }

    /// Aggregate an original and store the result as a new derived record.
    ///
    /// The original moves `completed → processing → completed` on success
    /// and `processing → failed` when any step after the claim fails.
    pub async fn process(&self, id: FileId, owner_id: PrincipalId) -> AppResult<ProcessOutcome> {
        let record = self.find_owned(id, owner_id).await?;
        if !record.is_original() {
            return Err(AppError::validation("Only original uploads can be processed")
                .with_code(codes::NOT_ORIGINAL));
        }
        if !self.storage.exists(&record.storage_location).await? {
            return Err(AppError::not_found(format!(
                "Stored workbook for file {id} no longer exists"
            )));
        }

        let _claim = self.claim(id)?;
        if !record.status.can(Transition::Claim) {
            return Err(self.claim_refused(id).await);
        }
        let target = settle(record.status, Transition::Claim)?;
        let Some(claimed) = self.files.update_status(id, record.status, target).await? else {
            return Err(self.claim_refused(id).await);
        };
        info!(file_id = %id, owner_id = %owner_id, "File processing started");

        let (aggregation, encoded) = match self.transform(&claimed).await {
            Ok(output) => output,
            Err(e) => return Err(self.revert_to_failed(id, e).await),
        };

        let now = self.clock.now();
        let processed_id = FileId::new();
        let location = artifact_path(processed_id, SpreadsheetFormat::Xlsx.extension(), now);
        let size = encoded.len() as i64;
        if let Err(e) = self.storage.write(&location, Bytes::from(encoded)).await {
            return Err(self.revert_to_failed(id, e).await);
        }

        let processed = FileRecord::new_processed(
            &claimed,
            processed_id,
            format!("{}_processed.xlsx", claimed.stem()),
            location,
            size,
            now,
        );
        let replaced = match self.commit_processing(&claimed, &processed, now).await {
            Ok(replaced) => replaced,
            Err(e) => {
                self.discard_artifact(&processed.storage_location).await;
                return Err(self.revert_to_failed(id, e).await);
            }
        };
        for stale in &replaced {
            self.discard_artifact(&stale.storage_location).await;
        }

        let original = self
            .files
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;

        info!(
            file_id = %id,
            processed_id = %processed.id,
            grouped_rows = aggregation.summary.grouped_rows,
            replaced = replaced.len(),
            "File processing completed"
        );

        Ok(ProcessOutcome {
            original,
            processed,
            summary: aggregation.summary,
            replaced: replaced.into_iter().map(|r| r.id).collect(),
        })
    }

    /// Delete one of `owner_id`'s records.
    pub async fn delete(&self, id: FileId, owner_id: PrincipalId) -> AppResult<DeletedFile> {
        self.find_owned(id, owner_id).await?;
        self.delete_audited(id, Actor::Principal(owner_id)).await
    }

    /// Delete any record on behalf of `actor`.
    pub async fn delete_any(&self, id: FileId, actor: Actor) -> AppResult<DeletedFile> {
        self.delete_audited(id, actor).await
    }

    /// Delete every record owned by `owner_id`.
    pub async fn delete_all_owned(&self, owner_id: PrincipalId) -> AppResult<BatchDeleteResult> {
        let ids: Vec<FileId> = self
            .files
            .find_by_owner(owner_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.delete_many(&ids, Actor::Principal(owner_id)).await
    }

    /// Delete several records, writing one batch audit entry.
    ///
    /// Missing and in-flight ids are skipped. The rows and the entry commit
    /// together, so a database failure deletes nothing; artifacts are
    /// removed after the commit.
    pub async fn delete_many(&self, ids: &[FileId], actor: Actor) -> AppResult<BatchDeleteResult> {
        let mut seen = HashSet::new();
        let mut result = BatchDeleteResult::default();
        let mut claims = Vec::new();
        let mut removed = Vec::new();

        let mut tx = self.files.begin().await?;
        for &id in ids.iter().filter(|id| seen.insert(**id)) {
            let Some(claim) = self.claims.try_claim(id) else {
                result.skipped += 1;
                continue;
            };
            match tx.delete(id).await? {
                Some(record) => {
                    claims.push(claim);
                    removed.push(record);
                    result.deleted += 1;
                }
                None => result.skipped += 1,
            }
        }

        self.audit
            .record(
                tx.as_mut(),
                CreateAuditLogEntry::file_batch(
                    actor,
                    actions::BATCH_DELETE_FILES,
                    serde_json::json!({ "deleted": result.deleted }),
                ),
            )
            .await?;
        tx.commit().await?;

        for record in &removed {
            self.delete_artifact(record).await;
        }
        drop(claims);

        info!(
            actor = %actor,
            deleted = result.deleted,
            skipped = result.skipped,
            "Batch delete finished"
        );
        Ok(result)
    }

    /// Move every `processing` record left behind by a previous run of the
    /// process to `failed`.
    pub async fn recover_interrupted(&self) -> AppResult<u64> {
        let failed = settle(FileStatus::Processing, Transition::Fail)?;
        let reset = self
            .files
            .update_status_all(FileStatus::Processing, failed)
            .await?;
        if reset > 0 {
            warn!(count = reset, "Reset interrupted processing runs to failed");
        }
        Ok(reset)
    }

    /// Remove the row and write its audit entry in one commit, then remove
    /// the artifact. The artifact step never fails the call; its outcome is
    /// reported instead.
    async fn delete_audited(&self, id: FileId, actor: Actor) -> AppResult<DeletedFile> {
        let _claim = self.claim(id)?;

        let mut tx: Box<dyn FileTransaction> = self.files.begin().await?;
        let Some(record) = tx.delete(id).await? else {
            drop(tx);
            return Err(match self.files.find_by_id(id).await? {
                Some(r) if r.status == FileStatus::Processing => already_processing(id),
                Some(_) => AppError::conflict(format!("File {id} could not be deleted")),
                None => AppError::not_found(format!("File {id} not found")),
            });
        };
        self.audit
            .record(
                tx.as_mut(),
                CreateAuditLogEntry::file(
                    actor,
                    actions::DELETE_FILE,
                    id,
                    serde_json::json!({ "fileName": record.file_name }),
                ),
            )
            .await?;
        tx.commit().await?;

        let physical = self.delete_artifact(&record).await;
        info!(file_id = %id, owner_id = %record.owner_id, physical = ?physical, "File deleted");
        Ok(DeletedFile { record, physical })
    }

    /// Remove the artifact behind a deleted row.
    pub(crate) async fn delete_artifact(&self, record: &FileRecord) -> PhysicalDelete {
        match self.storage.delete(&record.storage_location).await {
            Ok(true) => PhysicalDelete::Removed,
            Ok(false) => {
                warn!(file_id = %record.id, location = %record.storage_location, "Artifact already missing");
                PhysicalDelete::Missing
            }
            Err(e) => {
                warn!(
                    file_id = %record.id,
                    location = %record.storage_location,
                    "Failed to delete artifact: {e}"
                );
                PhysicalDelete::Failed
            }
        }
    }

    pub(crate) fn claim(&self, id: FileId) -> AppResult<ClaimGuard> {
        self.claims.try_claim(id).ok_or_else(|| already_processing(id))
    }

    /// Look up a record, hiding records owned by someone else.
    pub(crate) async fn find_owned(&self, id: FileId, owner_id: PrincipalId) -> AppResult<FileRecord> {
        self.files
            .find_by_id(id)
            .await?
            .filter(|r| r.is_owned_by(owner_id))
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn transform(&self, record: &FileRecord) -> AppResult<(Aggregation, Vec<u8>)> {
        let data = self.storage.read_bytes(&record.storage_location).await?;
        let aggregator = Arc::clone(&self.aggregator);

        run_bounded(self.settings.transform_timeout, move || {
            let table = workbook::read_table(&data)?;
            let aggregation = aggregator.aggregate(&table)?;
            let encoded = workbook::write_table(&aggregation.table)?;
            Ok((aggregation, encoded))
        })
        .await
    }

    /// Explain why the conditional claim matched no row.
    async fn claim_refused(&self, id: FileId) -> AppError {
        match self.files.find_by_id(id).await {
            Ok(Some(r)) if r.status == FileStatus::Processing => already_processing(id),
            Ok(Some(r)) if !r.status.can(Transition::Claim) => AppError::conflict(format!(
                "File {id} cannot be processed while {}",
                r.status
            ))
            .with_code(codes::INVALID_TRANSITION),
            Ok(Some(_)) => AppError::conflict(format!("File {id} changed concurrently"))
                .with_code(codes::INVALID_TRANSITION),
            Ok(None) => AppError::not_found(format!("File {id} not found")),
            Err(e) => e,
        }
    }

    /// Insert the derived record and settle the original in one commit.
    /// Earlier derived records are dropped in the same commit and the
    /// replacement is audited alongside.
    async fn commit_processing(
        &self,
        original: &FileRecord,
        processed: &FileRecord,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileRecord>> {
        let settled = settle(original.status, Transition::Succeed)?;

        let mut tx = self.files.begin().await?;
        let replaced = tx
            .complete_processing(original.id, settled, processed, now)
            .await?;
        if !replaced.is_empty() {
            let replaced_ids: Vec<FileId> = replaced.iter().map(|r| r.id).collect();
            self.audit
                .record(
                    tx.as_mut(),
                    CreateAuditLogEntry::file(
                        Actor::Principal(original.owner_id),
                        actions::REPLACE_PROCESSED,
                        original.id,
                        serde_json::json!({
                            "processedId": processed.id,
                            "replaced": replaced_ids,
                        }),
                    ),
                )
                .await?;
        }
        tx.commit().await?;
        Ok(replaced)
    }

    async fn revert_to_failed(&self, id: FileId, cause: AppError) -> AppError {
        let failed = match settle(FileStatus::Processing, Transition::Fail) {
            Ok(status) => status,
            Err(e) => return e,
        };
        match self.files.update_status(id, FileStatus::Processing, failed).await {
            Ok(Some(_)) => info!(file_id = %id, "File processing failed: {cause}"),
            Ok(None) => warn!(file_id = %id, "File processing failed but record was not processing"),
            Err(e) => error!(file_id = %id, "Could not mark file failed after '{cause}': {e}"),
        }
        cause
    }

    async fn discard_artifact(&self, location: &str) {
        if let Err(e) = self.storage.delete(location).await {
            warn!(location, "Failed to discard artifact: {e}");
        }
    }
}

/// Resolve `transition` through the status table.
fn settle(from: FileStatus, transition: Transition) -> AppResult<FileStatus> {
    from.apply(transition).ok_or_else(|| {
        AppError::conflict(format!("Cannot move from {from} on {transition:?}"))
            .with_code(codes::INVALID_TRANSITION)
    })
}

fn already_processing(id: FileId) -> AppError {
    AppError::conflict(format!("File {id} is busy with another operation"))
        .with_code(codes::ALREADY_PROCESSING)
}
