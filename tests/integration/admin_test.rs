//! Integration tests for the administrative console.

mod helpers;

use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;

use helpers::{Caller, TestApp, ledger_workbook};

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let app = TestApp::new();
    let user = Caller::user();

    for (method, path) in [
        ("GET", "/api/admin/files"),
        ("GET", "/api/admin/files/stats"),
        ("GET", "/api/admin/cleanup/config"),
        ("POST", "/api/admin/cleanup/run"),
    ] {
        let response = app.request(method, path, None, Some(user)).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN, "{method} {path}");
    }

    let response = app
        .request(
            "POST",
            "/api/admin/files/batch-delete",
            Some(json!({ "fileIds": [] })),
            Some(user),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_filters_across_owners() {
    let app = TestApp::new();
    let admin = Caller::admin();
    let alice = Caller::user();
    let bob = Caller::user();
    app.upload_workbook("alice-march.xlsx", &ledger_workbook(), alice).await;
    app.upload_workbook("bob-march.xlsx", &ledger_workbook(), bob).await;
    app.upload_workbook("bob-april.xlsx", &ledger_workbook(), bob).await;

    let all = app.request("GET", "/api/admin/files", None, Some(admin)).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.json["data"]["total"], 3);

    let bobs = app
        .request(
            "GET",
            &format!("/api/admin/files?userId={}", bob.id),
            None,
            Some(admin),
        )
        .await;
    assert_eq!(bobs.json["data"]["total"], 2);

    let april = app
        .request("GET", "/api/admin/files?keyword=APRIL", None, Some(admin))
        .await;
    assert_eq!(april.json["data"]["total"], 1);
    assert_eq!(april.json["data"]["items"][0]["fileName"], "bob-april.xlsx");

    let none = app
        .request(
            "GET",
            "/api/admin/files?fileType=processed&statusFilter=completed",
            None,
            Some(admin),
        )
        .await;
    assert_eq!(none.json["data"]["total"], 0);
}

#[tokio::test]
async fn test_patch_updates_remark_and_status_with_audit() {
    let app = TestApp::new();
    let admin = Caller::admin();
    let id = app
        .upload_workbook("march.xlsx", &ledger_workbook(), Caller::user())
        .await;

    let response = app
        .request(
            "PATCH",
            &format!("/api/admin/files/{id}"),
            Some(json!({ "remark": "checked by finance", "status": "failed" })),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.json);
    assert_eq!(response.json["data"]["remark"], "checked by finance");
    assert_eq!(response.json["data"]["status"], "failed");

    let detail = app
        .request("GET", &format!("/api/admin/files/{id}"), None, Some(admin))
        .await;
    assert_eq!(detail.json["data"]["status"], "failed");

    let entries = app.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "update_file");
    assert_eq!(entries[0].target_id, id);
    assert_eq!(entries[0].actor, admin.id.to_string());
}

#[tokio::test]
async fn test_patch_rejects_invalid_changes() {
    let app = TestApp::new();
    let admin = Caller::admin();
    let id = app
        .upload_workbook("march.xlsx", &ledger_workbook(), Caller::user())
        .await;

    let processing = app
        .request(
            "PATCH",
            &format!("/api/admin/files/{id}"),
            Some(json!({ "status": "processing" })),
            Some(admin),
        )
        .await;
    assert_eq!(processing.status, StatusCode::CONFLICT);
    assert_eq!(processing.json["code"], "invalid_transition");

    let long = app
        .request(
            "PATCH",
            &format!("/api/admin/files/{id}"),
            Some(json!({ "remark": "x".repeat(256) })),
            Some(admin),
        )
        .await;
    assert_eq!(long.status, StatusCode::BAD_REQUEST);

    let empty = app
        .request("PATCH", &format!("/api/admin/files/{id}"), Some(json!({})), Some(admin))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    assert!(app.audit.entries().await.is_empty());
}

#[tokio::test]
async fn test_batch_delete_counts_skips() {
    let app = TestApp::new();
    let admin = Caller::admin();
    let a = app.upload_workbook("a.xlsx", &ledger_workbook(), Caller::user()).await;
    let b = app.upload_workbook("b.xlsx", &ledger_workbook(), Caller::user()).await;

    let response = app
        .request(
            "POST",
            "/api/admin/files/batch-delete",
            Some(json!({ "fileIds": [a, b, "0195a4b2-0000-7000-8000-000000000000"] })),
            Some(admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["data"], json!({ "deleted": 2, "skipped": 1 }));

    let entries = app.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "batch_delete_files");
    assert_eq!(entries[0].details, json!({ "deleted": 2 }));

    let empty = app
        .request(
            "POST",
            "/api/admin/files/batch-delete",
            Some(json!({ "fileIds": [] })),
            Some(admin),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_and_single_delete() {
    let app = TestApp::new();
    let admin = Caller::admin();
    let id = app
        .upload_workbook("march.xlsx", &ledger_workbook(), Caller::user())
        .await;

    let stats = app
        .request("GET", "/api/admin/files/stats", None, Some(admin))
        .await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.json["data"]["totalFiles"], 1);
    assert_eq!(stats.json["data"]["uploadsLast7Days"], 1);
    assert!(stats.json["data"]["totalStorageBytes"].as_u64().unwrap() > 0);

    let deleted = app
        .request("DELETE", &format!("/api/admin/files/{id}"), None, Some(admin))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.json["data"]["record"]["id"], id);

    let missing = app
        .request("GET", &format!("/api/admin/files/{id}"), None, Some(admin))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cleanup_config_and_run() {
    let app = TestApp::new();
    let admin = Caller::admin();
    app.upload_workbook("old.xlsx", &ledger_workbook(), Caller::user()).await;
    app.clock.advance(Duration::days(4));
    app.upload_workbook("new.xlsx", &ledger_workbook(), Caller::user()).await;

    let config = app
        .request("GET", "/api/admin/cleanup/config", None, Some(admin))
        .await;
    assert_eq!(
        config.json["data"],
        json!({ "retentionDays": 3, "scheduleHour": 3, "scheduleMinute": 0 })
    );

    let run = app
        .request("POST", "/api/admin/cleanup/run", None, Some(admin))
        .await;
    assert_eq!(run.status, StatusCode::OK);
    assert_eq!(
        run.json["data"],
        json!({ "deletedRecords": 1, "deletedPhysicalFiles": 1, "failedPhysicalDeletes": 0 })
    );
    assert_eq!(app.files.all().await.len(), 1);

    let entries = app.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "run_cleanup");
    assert_eq!(entries[0].actor, admin.id.to_string());
}
