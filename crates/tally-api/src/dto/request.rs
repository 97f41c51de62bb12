//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use tally_core::types::id::{FileId, PrincipalId};
use tally_database::FileFilter;
use tally_entity::file::{FileKind, FileStatus};
use tally_service::UpdateFileRecord;

use crate::extractors::pagination::{default_page, default_page_size};
use crate::extractors::PaginationParams;

/// Which records the history view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryType {
    /// Originals and derived records.
    #[default]
    All,
    /// Originals only.
    Original,
    /// Derived records only.
    Processed,
}

impl HistoryType {
    /// The kind filter this selection maps to.
    pub fn kind(self) -> Option<FileKind> {
        match self {
            Self::All => None,
            Self::Original => Some(FileKind::Original),
            Self::Processed => Some(FileKind::Processed),
        }
    }
}

/// `GET /api/files/history` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// Kind filter.
    #[serde(default, rename = "type")]
    pub kind: HistoryType,
    /// Page number.
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl HistoryQuery {
    /// Paging part of the query.
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// `GET /api/files/{id}/preview` query.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewQuery {
    /// Page number.
    #[serde(default = "default_page")]
    pub page: u64,
    /// Rows per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

/// `GET /api/admin/files` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFileQuery {
    /// Owner filter.
    pub user_id: Option<Uuid>,
    /// Kind filter.
    pub file_type: Option<FileKind>,
    /// Status filter.
    pub status_filter: Option<FileStatus>,
    /// Case-insensitive substring of the display name.
    pub keyword: Option<String>,
    /// Uploaded at or after.
    pub date_from: Option<DateTime<Utc>>,
    /// Uploaded at or before.
    pub date_to: Option<DateTime<Utc>>,
    /// Page number.
    #[serde(default = "default_page")]
    pub page: u64,
    /// Page size.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl AdminFileQuery {
    /// Repository filter for this query.
    pub fn filter(&self) -> FileFilter {
        FileFilter {
            owner_id: self.user_id.map(PrincipalId::from),
            kind: self.file_type,
            status: self.status_filter,
            keyword: self
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from),
            uploaded_from: self.date_from,
            uploaded_to: self.date_to,
        }
    }

    /// Paging part of the query.
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// `PATCH /api/admin/files/{id}` body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    /// New remark.
    #[validate(length(max = 255, message = "remark must be at most 255 characters"))]
    pub remark: Option<String>,
    /// Status override.
    pub status: Option<FileStatus>,
}

impl From<UpdateFileRequest> for UpdateFileRecord {
    fn from(req: UpdateFileRequest) -> Self {
        Self {
            remark: req.remark,
            status: req.status,
        }
    }
}

/// `POST /api/admin/files/batch-delete` body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    /// Records to delete.
    #[validate(length(min = 1, message = "fileIds must not be empty"))]
    pub file_ids: Vec<FileId>,
}
