//! Storage key layout.

use chrono::{DateTime, Utc};
use tally_core::types::id::FileId;

/// Key of an artifact: `{YYYYMM}/{id}.{ext}`, partitioned by the
/// creation month.
pub fn artifact_path(id: FileId, extension: &str, created_at: DateTime<Utc>) -> String {
    format!("{}/{}.{}", created_at.format("%Y%m"), id, extension)
}
