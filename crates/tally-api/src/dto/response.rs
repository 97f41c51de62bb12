//! Response DTOs.

use serde::{Deserialize, Serialize};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `GET /api/health` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` when every dependency is healthy, otherwise `degraded`.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Storage provider name.
    pub storage_provider: String,
    /// Whether storage answered its health check.
    pub storage: bool,
    /// `connected`, `unavailable`, or `in-memory`.
    pub database: String,
}
