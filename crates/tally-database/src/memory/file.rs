//! In-memory file record repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use tally_core::error::{AppError, codes};
use tally_core::result::AppResult;
use tally_core::types::id::{AuditLogId, FileId, PrincipalId};
use tally_core::types::pagination::{PageRequest, PageResponse};
use tally_entity::audit::{AuditLogEntry, CreateAuditLogEntry};
use tally_entity::file::{FileKind, FileRecord, FileStatus};

use super::audit::MemoryAuditLog;
use crate::repositories::{FileFilter, FileRecordRepository, FileStats, FileTransaction};

type Rows = HashMap<FileId, FileRecord>;

/// File record repository holding rows in a map, with its own audit log.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileRecordRepository {
    rows: Arc<Mutex<Rows>>,
    audit: MemoryAuditLog,
}

impl MemoryFileRecordRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// The audit log written by this repository's transactions.
    pub fn audit_log(&self) -> MemoryAuditLog {
        self.audit.clone()
    }

    /// Snapshot of every row, newest upload first.
    pub async fn all(&self) -> Vec<FileRecord> {
        let rows = self.rows.lock().await;
        newest_first(rows.values().cloned().collect())
    }
}

fn newest_first(mut records: Vec<FileRecord>) -> Vec<FileRecord> {
    records.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| b.id.into_uuid().cmp(&a.id.into_uuid()))
    });
    records
}

#[async_trait]
impl FileRecordRepository for MemoryFileRecordRepository {
    async fn insert(&self, record: &FileRecord) -> AppResult<()> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&record.id) {
            return Err(AppError::conflict(format!(
                "File record {} already exists",
                record.id
            )));
        }
        rows.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[FileId]) -> AppResult<Vec<FileRecord>> {
        let rows = self.rows.lock().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn find_by_owner(&self, owner_id: PrincipalId) -> AppResult<Vec<FileRecord>> {
        let rows = self.rows.lock().await;
        Ok(newest_first(
            rows.values()
                .filter(|r| r.owner_id == owner_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_uploaded_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<FileRecord>> {
        let rows = self.rows.lock().await;
        let mut expired: Vec<FileRecord> = rows
            .values()
            .filter(|r| r.uploaded_at < cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(|r| r.uploaded_at);
        Ok(expired)
    }

    async fn list(&self, filter: &FileFilter, page: PageRequest) -> AppResult<PageResponse<FileRecord>> {
        let rows = self.rows.lock().await;
        let matching = newest_first(rows.values().filter(|r| filter.matches(r)).cloned().collect());
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok(PageResponse::new(items, page, total))
    }

    async fn update_status(
        &self,
        id: FileId,
        from: FileStatus,
        to: FileStatus,
    ) -> AppResult<Option<FileRecord>> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&id) {
            Some(r) if r.status == from => {
                r.status = to;
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_status_all(&self, from: FileStatus, to: FileStatus) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let mut changed = 0;
        for r in rows.values_mut().filter(|r| r.status == from) {
            r.status = to;
            changed += 1;
        }
        Ok(changed)
    }

    async fn begin(&self) -> AppResult<Box<dyn FileTransaction>> {
        let guard = Arc::clone(&self.rows).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryFileTransaction {
            guard,
            working,
            audit: self.audit.clone(),
            staged: Vec::new(),
        }))
    }

    async fn stats(&self, uploads_since: DateTime<Utc>) -> AppResult<FileStats> {
        let rows = self.rows.lock().await;
        Ok(FileStats {
            total_files: rows.len() as u64,
            total_storage_bytes: rows.values().map(|r| r.size_bytes.max(0) as u64).sum(),
            uploads_since: rows
                .values()
                .filter(|r| r.uploaded_at >= uploads_since)
                .count() as u64,
        })
    }
}

/// Holds the row lock and works on a copy that replaces the rows on
/// commit.
#[derive(Debug)]
pub struct MemoryFileTransaction {
    guard: OwnedMutexGuard<Rows>,
    working: Rows,
    audit: MemoryAuditLog,
    staged: Vec<AuditLogEntry>,
}

#[async_trait]
impl FileTransaction for MemoryFileTransaction {
    async fn delete(&mut self, id: FileId) -> AppResult<Option<FileRecord>> {
        if self
            .working
            .get(&id)
            .is_some_and(|r| r.status == FileStatus::Processing)
        {
            return Ok(None);
        }
        Ok(self.working.remove(&id))
    }

    async fn complete_processing(
        &mut self,
        original_id: FileId,
        settled: FileStatus,
        processed: &FileRecord,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileRecord>> {
        let rows = &mut self.working;

        let in_flight = rows
            .get(&original_id)
            .is_some_and(|r| r.status == FileStatus::Processing);
        if !in_flight {
            return Err(AppError::conflict(format!(
                "File {original_id} is no longer processing"
            ))
            .with_code(codes::INVALID_TRANSITION));
        }
        if rows.contains_key(&processed.id) {
            return Err(AppError::conflict(format!(
                "File record {} already exists",
                processed.id
            )));
        }

        let stale: Vec<FileId> = rows
            .values()
            .filter(|r| r.kind == FileKind::Processed && r.derived_from == Some(original_id))
            .map(|r| r.id)
            .collect();
        let replaced = stale.iter().filter_map(|id| rows.remove(id)).collect();

        rows.insert(processed.id, processed.clone());
        if let Some(original) = rows.get_mut(&original_id) {
            original.status = settled;
            original.processed_at.get_or_insert(now);
        }

        Ok(replaced)
    }

    async fn update_admin_fields(
        &mut self,
        id: FileId,
        expected: FileStatus,
        remark: Option<String>,
        status: Option<FileStatus>,
    ) -> AppResult<Option<FileRecord>> {
        match self.working.get_mut(&id) {
            Some(r) if r.status == expected => {
                if let Some(remark) = remark {
                    r.remark = remark;
                }
                if let Some(status) = status {
                    r.status = status;
                }
                Ok(Some(r.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn append_audit(
        &mut self,
        entry: &CreateAuditLogEntry,
        at: DateTime<Utc>,
    ) -> AppResult<AuditLogEntry> {
        self.audit.check_append()?;
        let stored = AuditLogEntry {
            id: AuditLogId::new(),
            actor: entry.actor.clone(),
            action: entry.action.clone(),
            target_type: entry.target_type.clone(),
            target_id: entry.target_id.clone(),
            details: entry.details.clone(),
            created_at: at,
        };
        self.staged.push(stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self {
            mut guard,
            working,
            audit,
            staged,
        } = *self;
        *guard = working;
        audit.extend(staged).await;
        Ok(())
    }
}
