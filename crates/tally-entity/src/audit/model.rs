//! Audit log entry entity model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::types::id::{AuditLogId, FileId, PrincipalId};

/// Action tags written to the trail.
pub mod actions {
    /// An administrator changed a record's remark or status.
    pub const UPDATE_FILE: &str = "update_file";
    /// A single record was deleted.
    pub const DELETE_FILE: &str = "delete_file";
    /// Re-processing an original removed its earlier derived records.
    pub const REPLACE_PROCESSED: &str = "replace_processed";
    /// Several records were deleted in one request.
    pub const BATCH_DELETE_FILES: &str = "batch_delete_files";
    /// A retention sweep ran.
    pub const RUN_CLEANUP: &str = "run_cleanup";
}

/// Target types and sentinel target identifiers.
pub mod targets {
    /// A file record.
    pub const FILE: &str = "file";
    /// The system itself.
    pub const SYSTEM: &str = "system";
    /// Sentinel id for batch operations.
    pub const MULTIPLE: &str = "multiple";
    /// Sentinel id for retention sweeps.
    pub const CLEANUP: &str = "cleanup";
}

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The scheduler or another unattended component.
    System,
    /// An authenticated principal.
    Principal(PrincipalId),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Principal(id) => write!(f, "{id}"),
        }
    }
}

impl From<PrincipalId> for Actor {
    fn from(id: PrincipalId) -> Self {
        Self::Principal(id)
    }
}

/// An immutable audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Unique audit entry identifier.
    pub id: AuditLogId,
    /// Principal id, or `"system"` for unattended actions.
    pub actor: String,
    /// The action tag (see [`actions`]).
    pub action: String,
    /// Type of the target (see [`targets`]).
    pub target_type: String,
    /// Target identifier or a sentinel.
    pub target_id: String,
    /// Action-specific payload.
    pub details: serde_json::Value,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

/// Data required to append a new audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    /// Principal id or `"system"`.
    pub actor: String,
    /// The action tag.
    pub action: String,
    /// Target resource type.
    pub target_type: String,
    /// Target identifier or sentinel.
    pub target_id: String,
    /// Action-specific payload.
    pub details: serde_json::Value,
}

impl CreateAuditLogEntry {
    /// An entry about a single file record.
    pub fn file(actor: Actor, action: &str, file_id: FileId, details: serde_json::Value) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            target_type: targets::FILE.to_string(),
            target_id: file_id.to_string(),
            details,
        }
    }

    /// An entry about a batch of file records.
    pub fn file_batch(actor: Actor, action: &str, details: serde_json::Value) -> Self {
        Self {
            actor: actor.to_string(),
            action: action.to_string(),
            target_type: targets::FILE.to_string(),
            target_id: targets::MULTIPLE.to_string(),
            details,
        }
    }

    /// An entry for a retention sweep.
    pub fn cleanup(actor: Actor, details: serde_json::Value) -> Self {
        Self {
            actor: actor.to_string(),
            action: actions::RUN_CLEANUP.to_string(),
            target_type: targets::SYSTEM.to_string(),
            target_id: targets::CLEANUP.to_string(),
            details,
        }
    }
}
