//! Upload, processing, history, preview, download, and delete handlers
//! for the caller's own files.

use axum::Json;
use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use validator::Validate;

use tally_core::error::AppError;
use tally_core::types::id::FileId;
use tally_core::types::pagination::PageResponse;
use tally_entity::file::FileRecord;
use tally_service::{BatchDeleteResult, DeletedFile, Preview, ProcessOutcome, Upload};

use crate::dto::request::{HistoryQuery, PreviewQuery};
use crate::dto::response::ApiResponse;
use crate::error::ApiResult;
use crate::extractors::CurrentPrincipal;
use crate::state::AppState;

/// Multipart field carrying the workbook.
const FILE_FIELD: &str = "file";

/// POST /api/files/upload
pub async fn upload_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ApiResponse<FileRecord>>)> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(String::from);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
        upload = Some(Upload::new(principal.id, file_name, content_type, data));
        break;
    }

    let upload = upload.ok_or_else(|| AppError::validation("file is required"))?;
    let record = state.lifecycle.ingest(upload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

/// POST /api/files/{id}/process
pub async fn process_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<FileId>,
) -> ApiResult<Json<ApiResponse<ProcessOutcome>>> {
    let outcome = state.lifecycle.process(id, principal.id).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/files/history?type=all|original|processed
pub async fn history(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<PageResponse<FileRecord>>>> {
    let paging = query.pagination();
    paging.validate()?;
    let page = state
        .queries
        .history(principal.id, query.kind.kind(), paging.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// DELETE /api/files/history
pub async fn clear_history(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
) -> ApiResult<Json<ApiResponse<BatchDeleteResult>>> {
    let result = state.lifecycle.delete_all_owned(principal.id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// DELETE /api/files/{id}
pub async fn delete_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<FileId>,
) -> ApiResult<Json<ApiResponse<DeletedFile>>> {
    let deleted = state.lifecycle.delete(id, principal.id).await?;
    Ok(Json(ApiResponse::ok(deleted)))
}

/// GET /api/files/{id}/preview?page=&pageSize=
pub async fn preview_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<FileId>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<Json<ApiResponse<Preview>>> {
    let preview = state
        .queries
        .preview(id, principal.id, query.page, query.page_size)
        .await?;
    Ok(Json(ApiResponse::ok(preview)))
}

/// GET /api/files/{id}/download
pub async fn download_file(
    State(state): State<AppState>,
    principal: CurrentPrincipal,
    Path(id): Path<FileId>,
) -> ApiResult<Response> {
    let download = state.queries.download(id, principal.id).await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, download.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(&download.record.file_name),
        );
    if let Ok(len) = u64::try_from(download.record.size_bytes) {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    let response = builder
        .body(Body::from_stream(download.stream))
        .map_err(|e| AppError::internal(format!("Response build failed: {e}")))?;
    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987
/// `filename*` for the real name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(file_name, NON_ALPHANUMERIC);
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
