//! Upload validation and display-name rules.

use bytes::Bytes;

use tally_aggregate::SpreadsheetFormat;
use tally_aggregate::format::is_allowed_content_type;
use tally_core::error::{AppError, codes};
use tally_core::result::AppResult;
use tally_core::types::id::{FileId, PrincipalId};

/// An upload as received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    /// The principal who will own the record.
    pub owner_id: PrincipalId,
    /// Client-supplied file name, possibly empty.
    pub file_name: String,
    /// Client-declared content type, if any.
    pub content_type: Option<String>,
    /// The raw bytes.
    pub data: Bytes,
}

impl Upload {
    /// Create an upload.
    pub fn new(
        owner_id: PrincipalId,
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            owner_id,
            file_name: file_name.into(),
            content_type,
            data: data.into(),
        }
    }

    fn declared_content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
    }

    /// Check the upload and decide its spreadsheet format.
    ///
    /// Size is checked before format so oversized garbage is reported as
    /// too large rather than unrecognized.
    pub fn validate(&self, max_size_bytes: u64) -> AppResult<SpreadsheetFormat> {
        if self.data.is_empty() {
            return Err(AppError::validation("Uploaded file is empty").with_code(codes::EMPTY));
        }
        if self.data.len() as u64 > max_size_bytes {
            return Err(AppError::validation(format!(
                "Uploaded file is {} bytes; the limit is {max_size_bytes}",
                self.data.len()
            ))
            .with_code(codes::TOO_LARGE));
        }

        let content_type = self.declared_content_type();
        let format = SpreadsheetFormat::detect(&self.file_name, content_type, &self.data)
            .ok_or_else(|| {
                AppError::validation("Only .xlsx and .xls workbooks are accepted")
                    .with_code(codes::UNRECOGNIZED_FORMAT)
            })?;

        if let Some(declared) = content_type.filter(|ct| !is_allowed_content_type(ct)) {
            return Err(AppError::validation(format!(
                "Unsupported content type: {declared}"
            ))
            .with_code(codes::UNSUPPORTED_CONTENT_TYPE));
        }

        Ok(format)
    }

    /// Name shown to clients: the last path segment of the client name, or
    /// `{id}.{ext}` when none was given.
    pub fn display_name(&self, id: FileId, format: SpreadsheetFormat) -> String {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if base.is_empty() {
            format!("{id}.{}", format.extension())
        } else {
            base.to_string()
        }
    }
}
