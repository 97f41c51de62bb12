//! Aggregation pipeline configuration.

use serde::{Deserialize, Serialize};

/// Limits applied to the aggregation transform and preview reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Upper bound on a single parse + aggregate + encode run, in seconds.
    #[serde(default = "default_transform_timeout")]
    pub transform_timeout_seconds: u64,
    /// Largest page size accepted by the preview endpoint.
    #[serde(default = "default_preview_max_page_size")]
    pub preview_max_page_size: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            transform_timeout_seconds: default_transform_timeout(),
            preview_max_page_size: default_preview_max_page_size(),
        }
    }
}

fn default_transform_timeout() -> u64 {
    60
}

fn default_preview_max_page_size() -> u64 {
    100
}
