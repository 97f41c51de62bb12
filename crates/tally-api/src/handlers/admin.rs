//! Administrative file console handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use validator::Validate;

use tally_core::types::id::FileId;
use tally_core::types::pagination::PageResponse;
use tally_entity::file::FileRecord;
use tally_service::{
    AdminStats, BatchDeleteResult, CleanupResult, CleanupSettings, DeletedFile,
};

use crate::dto::request::{AdminFileQuery, BatchDeleteRequest, UpdateFileRequest};
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::CurrentPrincipal;
use crate::state::AppState;

/// GET /api/admin/files
pub async fn list_files(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Query(query): Query<AdminFileQuery>,
) -> ApiResult<Json<ApiResponse<PageResponse<FileRecord>>>> {
    let paging = query.pagination();
    paging.validate()?;
    let page = state
        .admin
        .list(&principal, &query.filter(), paging.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/admin/files/stats
pub async fn stats(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<Json<ApiResponse<AdminStats>>> {
    let stats = state.admin.stats(&principal).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/admin/files/{id}
pub async fn get_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<FileId>,
) -> ApiResult<Json<ApiResponse<FileRecord>>> {
    let record = state.admin.detail(&principal, id).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// PATCH /api/admin/files/{id}
pub async fn update_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<FileId>,
    Json(req): Json<UpdateFileRequest>,
) -> ApiResult<Json<ApiResponse<FileRecord>>> {
    principal.require_admin()?;
    req.validate()?;
    let record = state.admin.update(&principal, id, req.into()).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// DELETE /api/admin/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<FileId>,
) -> ApiResult<Json<ApiResponse<DeletedFile>>> {
    let deleted = state.admin.delete(&principal, id).await?;
    Ok(Json(ApiResponse::ok(deleted)))
}

/// POST /api/admin/files/batch-delete
pub async fn batch_delete(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Json(req): Json<BatchDeleteRequest>,
) -> ApiResult<Json<ApiResponse<BatchDeleteResult>>> {
    principal.require_admin()?;
    req.validate()?;
    let result = state.admin.batch_delete(&principal, &req.file_ids).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /api/admin/cleanup/config
pub async fn cleanup_config(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<Json<ApiResponse<CleanupSettings>>> {
    let settings = state.admin.cleanup_settings(&principal)?;
    Ok(Json(ApiResponse::ok(settings)))
}

/// POST /api/admin/cleanup/run
pub async fn run_cleanup(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<Json<ApiResponse<CleanupResult>>> {
    let result = state.admin.run_cleanup(&principal).await?;
    Ok(Json(ApiResponse::ok(result)))
}
