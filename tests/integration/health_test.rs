//! Integration tests for the health endpoint.

mod helpers;

use axum::http::StatusCode;

use helpers::TestApp;

#[tokio::test]
async fn test_health_reports_in_memory_mode() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.json["data"];
    assert_eq!(data["status"], "ok");
    assert_eq!(data["database"], "in-memory");
    assert_eq!(data["storage"], true);
    assert_eq!(data["storageProvider"], "memory");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/nope", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
