//! Integration tests for the caller's own files.

mod helpers;

use axum::http::{StatusCode, header};
use serde_json::json;

use helpers::{Caller, TestApp, ledger_workbook, read_workbook, workbook_bytes};
use tally_aggregate::Cell;
use tally_core::config::AppConfig;

#[tokio::test]
async fn test_upload_creates_completed_original() {
    let app = TestApp::new();
    let caller = Caller::user();

    let response = app
        .upload(
            "reports/march.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            &ledger_workbook(),
            caller,
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let data = &response.json["data"];
    assert_eq!(data["kind"], "original");
    assert_eq!(data["status"], "completed");
    assert_eq!(data["fileName"], "march.xlsx");
    assert_eq!(data["ownerId"], caller.id.to_string());
    assert_eq!(app.storage.len(), 1);
}

#[tokio::test]
async fn test_requests_without_principal_are_unauthorized() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/files/history", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_upload_rejections_carry_reason_codes() {
    let app = TestApp::with_config({
        let mut config = AppConfig::default();
        config.storage.max_upload_size_bytes = 1024;
        config
    });
    let caller = Caller::user();

    let empty = app.upload("a.xlsx", "application/octet-stream", b"", caller).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.json["code"], "empty");

    let garbage = app
        .upload("notes.txt", "text/plain", b"period,qty\n202501,5\n", caller)
        .await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);
    assert_eq!(garbage.json["code"], "unrecognized_format");

    let large = app
        .upload("big.xlsx", "application/octet-stream", &ledger_workbook(), caller)
        .await;
    assert_eq!(large.status, StatusCode::BAD_REQUEST);
    assert_eq!(large.json["code"], "too_large");

    assert!(app.storage.is_empty());
    assert!(app.files.all().await.is_empty());
}

#[tokio::test]
async fn test_process_then_download_aggregated_workbook() {
    let app = TestApp::new();
    let caller = Caller::user();
    let id = app.upload_workbook("march.xlsx", &ledger_workbook(), caller).await;

    let response = app
        .request("POST", &format!("/api/files/{id}/process"), None, Some(caller))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.json);
    let data = &response.json["data"];
    assert_eq!(data["summary"]["totalRows"], 3);
    assert_eq!(data["summary"]["groupedRows"], 2);
    assert_eq!(data["summary"]["periodColumnName"], "period");
    assert_eq!(data["processed"]["fileName"], "march_processed.xlsx");
    assert_eq!(data["processed"]["derivedFrom"], id);
    let processed_id = data["processed"]["id"].as_str().unwrap().to_string();

    let download = app
        .request(
            "GET",
            &format!("/api/files/{processed_id}/download"),
            None,
            Some(caller),
        )
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(
        download.headers[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = download.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"march_processed.xlsx\""));

    let table = read_workbook(&download.bytes);
    assert_eq!(table.columns, vec!["period", "qty"]);
    assert_eq!(
        table.rows,
        vec![
            vec![Cell::Text("202501".into()), Cell::Number(8.0)],
            vec![Cell::Text("202502".into()), Cell::Number(2.0)],
        ]
    );
}

#[tokio::test]
async fn test_process_failure_marks_original_failed() {
    let app = TestApp::new();
    let caller = Caller::user();
    let data = workbook_bytes(
        &["name", "amount"],
        vec![vec![Cell::Text("a".into()), Cell::Number(1.0)]],
    );
    let id = app.upload_workbook("plain.xlsx", &data, caller).await;

    let response = app
        .request("POST", &format!("/api/files/{id}/process"), None, Some(caller))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.json["code"], "period_column_not_found");

    let history = app
        .request("GET", "/api/files/history", None, Some(caller))
        .await;
    assert_eq!(history.json["data"]["total"], 1);
    assert_eq!(history.json["data"]["items"][0]["status"], "failed");

    let again = app
        .request("POST", &format!("/api/files/{id}/process"), None, Some(caller))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.json["code"], "invalid_transition");
}

#[tokio::test]
async fn test_other_principals_files_are_invisible() {
    let app = TestApp::new();
    let owner = Caller::user();
    let stranger = Caller::user();
    let id = app.upload_workbook("march.xlsx", &ledger_workbook(), owner).await;

    for (method, path) in [
        ("POST", format!("/api/files/{id}/process")),
        ("GET", format!("/api/files/{id}/preview")),
        ("GET", format!("/api/files/{id}/download")),
        ("DELETE", format!("/api/files/{id}")),
    ] {
        let response = app.request(method, &path, None, Some(stranger)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{method} {path}");
    }

    let history = app
        .request("GET", "/api/files/history", None, Some(stranger))
        .await;
    assert_eq!(history.json["data"]["total"], 0);
}

#[tokio::test]
async fn test_history_filters_by_type() {
    let app = TestApp::new();
    let caller = Caller::user();
    let id = app.upload_workbook("march.xlsx", &ledger_workbook(), caller).await;
    app.request("POST", &format!("/api/files/{id}/process"), None, Some(caller))
        .await;

    let all = app
        .request("GET", "/api/files/history?type=all", None, Some(caller))
        .await;
    assert_eq!(all.json["data"]["total"], 2);

    let processed = app
        .request("GET", "/api/files/history?type=processed", None, Some(caller))
        .await;
    assert_eq!(processed.json["data"]["total"], 1);
    assert_eq!(processed.json["data"]["items"][0]["kind"], "processed");

    let bad = app
        .request("GET", "/api/files/history?pageSize=500", None, Some(caller))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preview_pages_rows() {
    let app = TestApp::new();
    let caller = Caller::user();
    let id = app.upload_workbook("march.xlsx", &ledger_workbook(), caller).await;

    let response = app
        .request(
            "GET",
            &format!("/api/files/{id}/preview?page=2&pageSize=2"),
            None,
            Some(caller),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json["data"],
        json!({
            "columns": ["rate", "period", "qty"],
            "rows": [["13%", "202502", 2.0]],
            "total": 3,
            "page": 2,
            "pageSize": 2,
        })
    );

    let invalid = app
        .request(
            "GET",
            &format!("/api/files/{id}/preview?page=0"),
            None,
            Some(caller),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_removes_row_and_artifact() {
    let app = TestApp::new();
    let caller = Caller::user();
    let id = app.upload_workbook("march.xlsx", &ledger_workbook(), caller).await;

    let response = app
        .request("DELETE", &format!("/api/files/{id}"), None, Some(caller))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["data"]["physical"], "removed");
    assert!(app.storage.is_empty());

    let again = app
        .request("DELETE", &format!("/api/files/{id}"), None, Some(caller))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let entries = app.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "delete_file");
    assert_eq!(entries[0].actor, caller.id.to_string());
}

#[tokio::test]
async fn test_clear_history_only_touches_own_records() {
    let app = TestApp::new();
    let caller = Caller::user();
    let other = Caller::user();
    app.upload_workbook("a.xlsx", &ledger_workbook(), caller).await;
    app.upload_workbook("b.xlsx", &ledger_workbook(), caller).await;
    app.upload_workbook("c.xlsx", &ledger_workbook(), other).await;

    let response = app
        .request("DELETE", "/api/files/history", None, Some(caller))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["data"], json!({ "deleted": 2, "skipped": 0 }));
    assert_eq!(app.files.all().await.len(), 1);
}
