//! Audit trail rows.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use tally_core::error::{AppError, ErrorKind};
use tally_core::result::AppResult;
use tally_core::types::id::AuditLogId;
use tally_entity::audit::{AuditLogEntry, CreateAuditLogEntry};

/// Insert one entry on `conn`, normally inside the transaction that made
/// the audited change.
pub(crate) async fn insert_entry(
    conn: &mut PgConnection,
    entry: &CreateAuditLogEntry,
    at: DateTime<Utc>,
) -> AppResult<AuditLogEntry> {
    sqlx::query_as::<_, AuditLogEntry>(
        "INSERT INTO audit_log (id, actor, action, target_type, target_id, details, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(AuditLogId::new())
    .bind(&entry.actor)
    .bind(&entry.action)
    .bind(&entry.target_type)
    .bind(&entry.target_id)
    .bind(&entry.details)
    .bind(at)
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append audit entry", e))
}
