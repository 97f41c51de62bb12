//! Health check handler.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let storage = state
        .storage
        .health_check()
        .await
        .inspect_err(|e| warn!(error = %e, "Storage health check failed"))
        .unwrap_or(false);

    let (database, database_ok) = match &state.database {
        None => ("in-memory", true),
        Some(pool) => match pool.health_check().await {
            Ok(true) => ("connected", true),
            Ok(false) => ("unavailable", false),
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                ("unavailable", false)
            }
        },
    };

    let status = if storage && database_ok { "ok" } else { "degraded" };

    Json(ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_provider: state.storage.provider_type().to_string(),
        storage,
        database: database.to_string(),
    }))
}
