//! PostgreSQL file record repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use tally_core::error::{AppError, ErrorKind, codes};
use tally_core::result::AppResult;
use tally_core::types::id::{FileId, PrincipalId};
use tally_core::types::pagination::{PageRequest, PageResponse};
use tally_entity::audit::{AuditLogEntry, CreateAuditLogEntry};
use tally_entity::file::{FileRecord, FileStatus};

use super::audit::insert_entry;
use super::{FileFilter, FileRecordRepository, FileStats, FileTransaction};

const INSERT_SQL: &str = "INSERT INTO file_records \
     (id, owner_id, kind, derived_from, file_name, storage_location, size_bytes, \
      status, uploaded_at, processed_at, remark, soft_deleted_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

/// File record repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgFileRecordRepository {
    pool: PgPool,
}

impl PgFileRecordRepository {
    /// Create a new file record repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_err(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

fn insert_query(record: &FileRecord) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    sqlx::query(INSERT_SQL)
        .bind(record.id)
        .bind(record.owner_id)
        .bind(record.kind)
        .bind(record.derived_from)
        .bind(&record.file_name)
        .bind(&record.storage_location)
        .bind(record.size_bytes)
        .bind(record.status)
        .bind(record.uploaded_at)
        .bind(record.processed_at)
        .bind(&record.remark)
        .bind(record.soft_deleted_at)
}

/// Escape `%`, `_` and `\` so a keyword matches literally under `ILIKE`.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn where_clause(filter: &FileFilter) -> (String, u32) {
    let mut conditions = Vec::new();
    let mut idx = 1u32;
    let mut push = |column: &str| {
        conditions.push(column.replace('?', &format!("${idx}")));
        idx += 1;
    };

    if filter.owner_id.is_some() {
        push("owner_id = ?");
    }
    if filter.kind.is_some() {
        push("kind = ?");
    }
    if filter.status.is_some() {
        push("status = ?");
    }
    if filter.keyword.is_some() {
        push("file_name ILIKE ?");
    }
    if filter.uploaded_from.is_some() {
        push("uploaded_at >= ?");
    }
    if filter.uploaded_to.is_some() {
        push("uploaded_at <= ?");
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, idx)
}

/// Bind the filter's values in the order [`where_clause`] numbers them.
macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {{
        let filter: &FileFilter = $filter;
        let mut query = $query;
        if let Some(owner) = filter.owner_id {
            query = query.bind(owner);
        }
        if let Some(kind) = filter.kind {
            query = query.bind(kind);
        }
        if let Some(status) = filter.status {
            query = query.bind(status);
        }
        if let Some(keyword) = filter.keyword.as_deref() {
            query = query.bind(like_pattern(keyword));
        }
        if let Some(from) = filter.uploaded_from {
            query = query.bind(from);
        }
        if let Some(to) = filter.uploaded_to {
            query = query.bind(to);
        }
        query
    }};
}

#[async_trait]
impl FileRecordRepository for PgFileRecordRepository {
    async fn insert(&self, record: &FileRecord) -> AppResult<()> {
        insert_query(record)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                let duplicate = e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation());
                if duplicate {
                    AppError::conflict(format!("File record {} already exists", record.id))
                } else {
                    AppError::with_source(ErrorKind::Database, "Failed to insert file record", e)
                }
            })?;
        Ok(())
    }

    async fn find_by_id(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM file_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find file record"))
    }

    async fn find_by_ids(&self, ids: &[FileId]) -> AppResult<Vec<FileRecord>> {
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| id.into_uuid()).collect();
        sqlx::query_as::<_, FileRecord>("SELECT * FROM file_records WHERE id = ANY($1)")
            .bind(uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to find file records"))
    }

    async fn find_by_owner(&self, owner_id: PrincipalId) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM file_records WHERE owner_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to find owner's file records"))
    }

    async fn find_uploaded_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM file_records WHERE uploaded_at < $1 ORDER BY uploaded_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to find expired file records"))
    }

    async fn list(&self, filter: &FileFilter, page: PageRequest) -> AppResult<PageResponse<FileRecord>> {
        let (clause, next) = where_clause(filter);
        let count_sql = format!("SELECT COUNT(*) FROM file_records {clause}");
        let select_sql = format!(
            "SELECT * FROM file_records {clause} \
             ORDER BY uploaded_at DESC, id DESC LIMIT ${next} OFFSET ${}",
            next + 1
        );

        let total = bind_filter!(sqlx::query_scalar::<_, i64>(&count_sql), filter)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count file records"))?;

        let items = bind_filter!(sqlx::query_as::<_, FileRecord>(&select_sql), filter)
            .bind(page.limit() as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("Failed to list file records"))?;

        Ok(PageResponse::new(items, page, total.max(0) as u64))
    }

    async fn update_status(
        &self,
        id: FileId,
        from: FileStatus,
        to: FileStatus,
    ) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "UPDATE file_records SET status = $3 WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to update file status"))
    }

    async fn update_status_all(&self, from: FileStatus, to: FileStatus) -> AppResult<u64> {
        let result = sqlx::query("UPDATE file_records SET status = $2 WHERE status = $1")
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to update file statuses"))?;
        Ok(result.rows_affected())
    }

    async fn begin(&self) -> AppResult<Box<dyn FileTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin transaction"))?;
        Ok(Box::new(PgFileTransaction { tx }))
    }

    async fn stats(&self, uploads_since: DateTime<Utc>) -> AppResult<FileStats> {
        let (total_files, total_bytes, recent): (i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0)::BIGINT, \
             COUNT(*) FILTER (WHERE uploaded_at >= $1) FROM file_records",
        )
        .bind(uploads_since)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to compute file stats"))?;

        Ok(FileStats {
            total_files: total_files.max(0) as u64,
            total_storage_bytes: total_bytes.max(0) as u64,
            uploads_since: recent.max(0) as u64,
        })
    }
}

/// A PostgreSQL transaction over `file_records` and `audit_log`.
pub struct PgFileTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgFileTransaction {
    fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }
}

#[async_trait]
impl FileTransaction for PgFileTransaction {
    async fn delete(&mut self, id: FileId) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "DELETE FROM file_records WHERE id = $1 AND status <> 'processing' RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.conn())
        .await
        .map_err(db_err("Failed to delete file record"))
    }

    async fn complete_processing(
        &mut self,
        original_id: FileId,
        settled: FileStatus,
        processed: &FileRecord,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<FileRecord>> {
        let updated = sqlx::query(
            "UPDATE file_records SET status = $2, processed_at = COALESCE(processed_at, $3) \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(original_id)
        .bind(settled)
        .bind(now)
        .execute(self.conn())
        .await
        .map_err(db_err("Failed to complete original"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::conflict(format!(
                "File {original_id} is no longer processing"
            ))
            .with_code(codes::INVALID_TRANSITION));
        }

        let replaced = sqlx::query_as::<_, FileRecord>(
            "DELETE FROM file_records WHERE derived_from = $1 AND kind = 'processed' RETURNING *",
        )
        .bind(original_id)
        .fetch_all(self.conn())
        .await
        .map_err(db_err("Failed to remove previous derived records"))?;

        insert_query(processed)
            .execute(self.conn())
            .await
            .map_err(db_err("Failed to insert derived record"))?;

        Ok(replaced)
    }

    async fn update_admin_fields(
        &mut self,
        id: FileId,
        expected: FileStatus,
        remark: Option<String>,
        status: Option<FileStatus>,
    ) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "UPDATE file_records SET remark = COALESCE($3, remark), status = COALESCE($4, status) \
             WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(expected)
        .bind(remark)
        .bind(status)
        .fetch_optional(self.conn())
        .await
        .map_err(db_err("Failed to update file record"))
    }

    async fn append_audit(
        &mut self,
        entry: &CreateAuditLogEntry,
        at: DateTime<Utc>,
    ) -> AppResult<AuditLogEntry> {
        insert_entry(self.conn(), entry, at).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(db_err("Failed to commit transaction"))
    }
}
