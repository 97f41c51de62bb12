//! Read-only views of a principal's files.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use tally_aggregate::format::OCTET_STREAM_MIME;
use tally_aggregate::{Cell, SpreadsheetFormat, workbook};
use tally_core::config::processing::ProcessingConfig;
use tally_core::error::AppError;
use tally_core::result::AppResult;
use tally_core::traits::StorageProvider;
use tally_core::traits::storage::ByteStream;
use tally_core::types::id::{FileId, PrincipalId};
use tally_core::types::pagination::{PageRequest, PageResponse};
use tally_database::repositories::{FileFilter, FileRecordRepository};
use tally_entity::file::{FileKind, FileRecord};

use crate::blocking::run_bounded;

/// One page of a stored workbook's rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    /// Header row.
    pub columns: Vec<String>,
    /// Rows on this page, aligned with `columns`.
    pub rows: Vec<Vec<Cell>>,
    /// Data rows in the whole sheet.
    pub total: u64,
    /// Requested page (1-based).
    pub page: u64,
    /// Requested page size.
    pub page_size: u64,
}

/// A stored artifact ready to be streamed to a client.
pub struct Download {
    /// The record being downloaded.
    pub record: FileRecord,
    /// MIME type for the response.
    pub content_type: &'static str,
    /// The artifact's bytes.
    pub stream: ByteStream,
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("record", &self.record.id)
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// History, preview, and download for record owners.
#[derive(Debug, Clone)]
pub struct FileQueryService {
    /// File record repository.
    files: Arc<dyn FileRecordRepository>,
    /// Artifact storage.
    storage: Arc<dyn StorageProvider>,
    /// Upper bound on decoding a workbook for preview.
    decode_timeout: Duration,
    /// Largest accepted preview page.
    max_page_size: u64,
}

impl FileQueryService {
    /// Creates a new query service.
    pub fn new(
        files: Arc<dyn FileRecordRepository>,
        storage: Arc<dyn StorageProvider>,
        processing: &ProcessingConfig,
    ) -> Self {
        Self {
            files,
            storage,
            decode_timeout: Duration::from_secs(processing.transform_timeout_seconds.max(1)),
            max_page_size: processing.preview_max_page_size.max(1),
        }
    }

    /// An owner's records, newest first, optionally limited to one kind.
    pub async fn history(
        &self,
        owner_id: PrincipalId,
        kind: Option<FileKind>,
        page: PageRequest,
    ) -> AppResult<PageResponse<FileRecord>> {
        let filter = FileFilter {
            kind,
            ..FileFilter::owned_by(owner_id)
        };
        self.files.list(&filter, page).await
    }

    /// One page of rows from an owned workbook.
    pub async fn preview(
        &self,
        id: FileId,
        owner_id: PrincipalId,
        page: u64,
        page_size: u64,
    ) -> AppResult<Preview> {
        if page < 1 {
            return Err(AppError::validation("page must be at least 1"));
        }
        if !(1..=self.max_page_size).contains(&page_size) {
            return Err(AppError::validation(format!(
                "pageSize must be between 1 and {}",
                self.max_page_size
            )));
        }

        let record = self.find_owned(id, owner_id).await?;
        let data = self.storage.read_bytes(&record.storage_location).await?;
        let table = run_bounded(self.decode_timeout, move || workbook::read_table(&data)).await?;

        let offset = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
        let limit = usize::try_from(page_size).unwrap_or(usize::MAX);
        let rows = table.slice(offset, limit).to_vec();

        Ok(Preview {
            total: table.row_count() as u64,
            columns: table.columns,
            rows,
            page,
            page_size,
        })
    }

    /// Open an owned artifact for streaming.
    pub async fn download(&self, id: FileId, owner_id: PrincipalId) -> AppResult<Download> {
        let record = self.find_owned(id, owner_id).await?;
        let stream = self.storage.read(&record.storage_location).await?;
        let content_type = SpreadsheetFormat::from_file_name(&record.storage_location)
            .map(|f| f.mime_type())
            .unwrap_or(OCTET_STREAM_MIME);

        Ok(Download {
            record,
            content_type,
            stream,
        })
    }

    async fn find_owned(&self, id: FileId, owner_id: PrincipalId) -> AppResult<FileRecord> {
        self.files
            .find_by_id(id)
            .await?
            .filter(|r| r.is_owned_by(owner_id))
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, ledger_workbook, workbook_bytes};
    use futures::StreamExt;
    use tally_core::error::ErrorKind;

    #[tokio::test]
    async fn test_history_filters_by_kind() {
        let h = Harness::new();
        let owner = PrincipalId::new();
        let original = h.upload(owner, "a.xlsx", ledger_workbook()).await;
        h.lifecycle.process(original.id, owner).await.unwrap();
        h.upload(PrincipalId::new(), "other.xlsx", ledger_workbook()).await;

        let all = h.queries.history(owner, None, PageRequest::default()).await.unwrap();
        assert_eq!(all.total, 2);

        let processed = h
            .queries
            .history(owner, Some(FileKind::Processed), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(processed.total, 1);
        assert_eq!(processed.items[0].derived_from, Some(original.id));
    }

    #[tokio::test]
    async fn test_preview_pages_rows() {
        let h = Harness::new();
        let owner = PrincipalId::new();
        let rows = (0..25)
            .map(|i| vec![Cell::Text(format!("2025{:02}", i % 12 + 1)), Cell::Number(f64::from(i))])
            .collect();
        let record = h
            .upload(owner, "big.xlsx", workbook_bytes(&["month", "amount"], rows))
            .await;

        let preview = h.queries.preview(record.id, owner, 3, 10).await.unwrap();
        assert_eq!(preview.columns, vec!["month", "amount"]);
        assert_eq!(preview.total, 25);
        assert_eq!(preview.rows.len(), 5);
        assert_eq!(preview.rows[0][1], Cell::Number(20.0));

        let past_end = h.queries.preview(record.id, owner, 9, 10).await.unwrap();
        assert!(past_end.rows.is_empty());
    }

    #[tokio::test]
    async fn test_preview_validates_paging() {
        let h = Harness::new();
        let owner = PrincipalId::new();
        let record = h.upload(owner, "a.xlsx", ledger_workbook()).await;

        let err = h.queries.preview(record.id, owner, 0, 10).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        let err = h.queries.preview(record.id, owner, 1, 101).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_download_streams_owned_artifact() {
        let h = Harness::new();
        let owner = PrincipalId::new();
        let data = ledger_workbook();
        let record = h.upload(owner, "a.xlsx", data.clone()).await;

        let mut download = h.queries.download(record.id, owner).await.unwrap();
        assert_eq!(download.content_type, SpreadsheetFormat::Xlsx.mime_type());
        let mut received = Vec::new();
        while let Some(chunk) = download.stream.next().await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, data);

        let err = h
            .queries
            .download(record.id, PrincipalId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
