//! Repository traits and their PostgreSQL implementations.
//!
//! Audit entries are only written through a [`FileTransaction`], so an
//! entry commits or rolls back with the change it describes.

mod audit;
pub mod file;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::result::AppResult;
use tally_core::types::id::{FileId, PrincipalId};
use tally_core::types::pagination::{PageRequest, PageResponse};
use tally_entity::audit::{AuditLogEntry, CreateAuditLogEntry};
use tally_entity::file::{FileKind, FileRecord, FileStatus};

pub use file::{PgFileRecordRepository, PgFileTransaction};

/// Optional filters for listing file records. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Only records owned by this principal.
    pub owner_id: Option<PrincipalId>,
    /// Only records of this kind.
    pub kind: Option<FileKind>,
    /// Only records in this status.
    pub status: Option<FileStatus>,
    /// Case-insensitive substring of the display name.
    pub keyword: Option<String>,
    /// Uploaded at or after.
    pub uploaded_from: Option<DateTime<Utc>>,
    /// Uploaded at or before.
    pub uploaded_to: Option<DateTime<Utc>>,
}

impl FileFilter {
    /// Filter for one principal's records.
    pub fn owned_by(owner_id: PrincipalId) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    /// Whether `record` passes every set filter.
    pub fn matches(&self, record: &FileRecord) -> bool {
        self.owner_id.is_none_or(|o| record.owner_id == o)
            && self.kind.is_none_or(|k| record.kind == k)
            && self.status.is_none_or(|s| record.status == s)
            && self.keyword.as_deref().is_none_or(|kw| {
                record.file_name.to_lowercase().contains(&kw.to_lowercase())
            })
            && self.uploaded_from.is_none_or(|from| record.uploaded_at >= from)
            && self.uploaded_to.is_none_or(|to| record.uploaded_at <= to)
    }
}

/// Aggregate numbers for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    /// Number of records.
    pub total_files: u64,
    /// Sum of `size_bytes` over all records.
    pub total_storage_bytes: u64,
    /// Records uploaded at or after the requested instant.
    pub uploads_since: u64,
}

/// Persistence for [`FileRecord`]s.
///
/// The repository is passive: it never decides a transition, it only
/// applies conditional updates the lifecycle controller asks for.
#[async_trait]
pub trait FileRecordRepository: Send + Sync + std::fmt::Debug + 'static {
    /// Insert a new record. Duplicate ids are a conflict.
    async fn insert(&self, record: &FileRecord) -> AppResult<()>;

    /// Find a record by id.
    async fn find_by_id(&self, id: FileId) -> AppResult<Option<FileRecord>>;

    /// Find every record whose id is in `ids`.
    async fn find_by_ids(&self, ids: &[FileId]) -> AppResult<Vec<FileRecord>>;

    /// Every record owned by `owner_id`.
    async fn find_by_owner(&self, owner_id: PrincipalId) -> AppResult<Vec<FileRecord>>;

    /// Records uploaded strictly before `cutoff`, oldest first.
    async fn find_uploaded_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<FileRecord>>;

    /// Filtered listing, newest upload first.
    async fn list(&self, filter: &FileFilter, page: PageRequest) -> AppResult<PageResponse<FileRecord>>;

    /// Move a record from `from` to `to` if it is still in `from`.
    ///
    /// Returns the updated record, or `None` when the record is missing or
    /// its status moved.
    async fn update_status(
        &self,
        id: FileId,
        from: FileStatus,
        to: FileStatus,
    ) -> AppResult<Option<FileRecord>>;

    /// Move every record in `from` to `to`. Returns the number of rows
    /// changed.
    async fn update_status_all(&self, from: FileStatus, to: FileStatus) -> AppResult<u64>;

    /// Open a transaction for mutations that must commit together with
    /// their audit entry.
    async fn begin(&self) -> AppResult<Box<dyn FileTransaction>>;

    /// Dashboard counters.
    async fn stats(&self, uploads_since: DateTime<Utc>) -> AppResult<FileStats>;
}

/// A unit of work over file records and the audit trail.
///
/// Nothing is visible to other callers until [`FileTransaction::commit`];
/// dropping the transaction rolls it back.
#[async_trait]
pub trait FileTransaction: Send {
    /// Delete a record unless it is `processing`. Returns the deleted row.
    async fn delete(&mut self, id: FileId) -> AppResult<Option<FileRecord>>;

    /// Finish a processing run.
    ///
    /// Removes the original's previous derived records, inserts
    /// `processed`, and moves the original from `processing` to `settled`,
    /// setting `processed_at` if it was never set. Returns the removed
    /// derived records. Fails with a conflict when the original is not
    /// `processing`.
    async fn complete_processing(
        &mut self,
        original_id: FileId,
        settled: FileStatus,
        processed: &FileRecord,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileRecord>>;

    /// Apply an administrative change if the record is still in
    /// `expected` status. Returns the updated record, or `None` when the
    /// record is missing or its status moved.
    async fn update_admin_fields(
        &mut self,
        id: FileId,
        expected: FileStatus,
        remark: Option<String>,
        status: Option<FileStatus>,
    ) -> AppResult<Option<FileRecord>>;

    /// Append an audit entry stamped with `at`.
    async fn append_audit(
        &mut self,
        entry: &CreateAuditLogEntry,
        at: DateTime<Utc>,
    ) -> AppResult<AuditLogEntry>;

    /// Make every change visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_keyword_case_insensitively() {
        let owner = PrincipalId::new();
        let record = FileRecord::new_original(
            FileId::new(),
            owner,
            "Ledger-2025.xlsx",
            "202501/x.xlsx",
            1,
            Utc::now(),
        );
        let filter = FileFilter {
            keyword: Some("ledger".into()),
            ..FileFilter::owned_by(owner)
        };
        assert!(filter.matches(&record));

        let other = FileFilter {
            kind: Some(FileKind::Processed),
            ..FileFilter::default()
        };
        assert!(!other.matches(&record));
    }
}
