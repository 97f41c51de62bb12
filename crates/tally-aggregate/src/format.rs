//! Spreadsheet format detection.

use std::fmt;

/// MIME type of the Office Open XML workbook format.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// MIME type of the legacy binary workbook format.
pub const XLS_MIME: &str = "application/vnd.ms-excel";
/// Generic binary MIME type sent by clients that do not know better.
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

const ZIP_MAGIC: &[u8] = b"PK";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// A supported spreadsheet container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpreadsheetFormat {
    /// Office Open XML (`.xlsx`).
    Xlsx,
    /// Legacy compound document (`.xls`).
    Xls,
}

impl SpreadsheetFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }

    /// Canonical MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Xlsx => XLSX_MIME,
            Self::Xls => XLS_MIME,
        }
    }

    /// Detect from the file name's extension, case-insensitively.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        if lower.ends_with(".xlsx") {
            Some(Self::Xlsx)
        } else if lower.ends_with(".xls") {
            Some(Self::Xls)
        } else {
            None
        }
    }

    /// Detect from a declared content type. Only the two spreadsheet MIME
    /// types identify a format.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match essence(content_type).as_str() {
            XLSX_MIME => Some(Self::Xlsx),
            XLS_MIME => Some(Self::Xls),
            _ => None,
        }
    }

    /// Detect from the leading signature bytes.
    pub fn sniff(content: &[u8]) -> Option<Self> {
        if content.starts_with(ZIP_MAGIC) {
            Some(Self::Xlsx)
        } else if content.starts_with(OLE2_MAGIC) {
            Some(Self::Xls)
        } else {
            None
        }
    }

    /// Try the file name, then the content type, then the signature.
    pub fn detect(file_name: &str, content_type: Option<&str>, content: &[u8]) -> Option<Self> {
        Self::from_file_name(file_name)
            .or_else(|| content_type.and_then(Self::from_content_type))
            .or_else(|| Self::sniff(content))
    }
}

impl fmt::Display for SpreadsheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Whether a declared content type may accompany a spreadsheet upload.
pub fn is_allowed_content_type(content_type: &str) -> bool {
    matches!(
        essence(content_type).as_str(),
        XLSX_MIME | XLS_MIME | OCTET_STREAM_MIME
    )
}

/// Lowercased MIME type with parameters stripped.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}
