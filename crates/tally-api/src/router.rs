//! Route definitions for the Tally HTTP API.
//!
//! All routes are mounted under `/api`.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

/// Room for multipart framing on top of the largest accepted workbook, so
/// that oversized uploads reach the service and get its error code.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the router with every route and the request body limit.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.storage.max_upload_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let api_routes = Router::new()
        .merge(file_routes())
        .merge(admin_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}

/// The caller's own files
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(handlers::file::upload_file))
        .route(
            "/files/history",
            get(handlers::file::history).delete(handlers::file::clear_history),
        )
        .route("/files/{id}", delete(handlers::file::delete_file))
        .route("/files/{id}/process", post(handlers::file::process_file))
        .route("/files/{id}/preview", get(handlers::file::preview_file))
        .route("/files/{id}/download", get(handlers::file::download_file))
}

/// Admin-only endpoints
fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/files", get(handlers::admin::list_files))
        .route("/admin/files/stats", get(handlers::admin::stats))
        .route(
            "/admin/files/batch-delete",
            post(handlers::admin::batch_delete),
        )
        .route(
            "/admin/files/{id}",
            get(handlers::admin::get_file)
                .patch(handlers::admin::update_file)
                .delete(handlers::admin::delete_file),
        )
        .route("/admin/cleanup/config", get(handlers::admin::cleanup_config))
        .route("/admin/cleanup/run", post(handlers::admin::run_cleanup))
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
