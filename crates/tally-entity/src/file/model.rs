//! File record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::types::id::{FileId, PrincipalId};

use super::kind::FileKind;
use super::status::FileStatus;

/// Maximum length of an administrative remark.
pub const MAX_REMARK_LEN: usize = 255;

/// One stored spreadsheet artifact.
///
/// `derived_from` is set exactly when `kind` is [`FileKind::Processed`].
/// The referenced original may be deleted later; readers tolerate the
/// dangling reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique record identifier.
    pub id: FileId,
    /// The owning principal.
    pub owner_id: PrincipalId,
    /// Original upload or derived output.
    pub kind: FileKind,
    /// The original this record was derived from.
    pub derived_from: Option<FileId>,
    /// Client-facing display name.
    pub file_name: String,
    /// Key of the artifact in the storage provider.
    pub storage_location: String,
    /// Artifact size in bytes.
    pub size_bytes: i64,
    /// Current lifecycle status.
    pub status: FileStatus,
    /// When the record was created.
    pub uploaded_at: DateTime<Utc>,
    /// When the record was first successfully processed (originals) or
    /// produced (derived records).
    pub processed_at: Option<DateTime<Utc>>,
    /// Administrative annotation.
    pub remark: String,
    /// Reserved for soft deletion; never written by the pipeline.
    pub soft_deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Build a freshly uploaded original.
    pub fn new_original(
        id: FileId,
        owner_id: PrincipalId,
        file_name: impl Into<String>,
        storage_location: impl Into<String>,
        size_bytes: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            kind: FileKind::Original,
            derived_from: None,
            file_name: file_name.into(),
            storage_location: storage_location.into(),
            size_bytes,
            status: FileStatus::Completed,
            uploaded_at: now,
            processed_at: None,
            remark: String::new(),
            soft_deleted_at: None,
        }
    }

    /// Build the derived record produced by aggregating `original`.
    pub fn new_processed(
        original: &FileRecord,
        id: FileId,
        file_name: impl Into<String>,
        storage_location: impl Into<String>,
        size_bytes: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id: original.owner_id,
            kind: FileKind::Processed,
            derived_from: Some(original.id),
            file_name: file_name.into(),
            storage_location: storage_location.into(),
            size_bytes,
            status: FileStatus::Completed,
            uploaded_at: now,
            processed_at: Some(now),
            remark: String::new(),
            soft_deleted_at: None,
        }
    }

    /// Whether the record is an original upload.
    pub fn is_original(&self) -> bool {
        self.kind == FileKind::Original
    }

    /// Whether `principal` owns this record.
    pub fn is_owned_by(&self, principal: PrincipalId) -> bool {
        self.owner_id == principal
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }

    /// Lowercase extension of the stored artifact, if any.
    pub fn extension(&self) -> Option<String> {
        self.storage_location
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
    }
}
