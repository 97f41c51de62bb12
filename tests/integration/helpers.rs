//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use tally_aggregate::{Cell, Table, workbook};
use tally_api::AppState;
use tally_api::extractors::principal::{PRINCIPAL_ID_HEADER, PRINCIPAL_ROLE_HEADER};
use tally_core::config::AppConfig;
use tally_core::traits::FixedClock;
use tally_core::types::id::PrincipalId;
use tally_database::{MemoryAuditLog, MemoryFileRecordRepository};
use tally_storage::MemoryStorageProvider;

const BOUNDARY: &str = "tally-test-boundary";

/// A caller as the gateway would assert it.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub id: PrincipalId,
    pub admin: bool,
}

impl Caller {
    pub fn user() -> Self {
        Self {
            id: PrincipalId::new(),
            admin: false,
        }
    }

    pub fn admin() -> Self {
        Self {
            id: PrincipalId::new(),
            admin: true,
        }
    }
}

/// Test application over in-memory repositories and storage.
pub struct TestApp {
    /// The Axum app for making test requests
    pub router: Router,
    /// File rows, for direct inspection
    pub files: Arc<MemoryFileRecordRepository>,
    /// Audit rows, for direct inspection
    pub audit: MemoryAuditLog,
    /// Artifact store, for direct inspection
    pub storage: Arc<MemoryStorageProvider>,
    /// The frozen clock
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    /// Create a new test application with default limits.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a new test application with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        let files = Arc::new(MemoryFileRecordRepository::new());
        let audit = files.audit_log();
        let storage = Arc::new(MemoryStorageProvider::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap(),
        ));

        let state = AppState::new(
            config,
            files.clone(),
            storage.clone(),
            clock.clone(),
            None,
        );

        Self {
            router: tally_api::build_app(state),
            files,
            audit,
            storage,
            clock,
        }
    }

    /// Make a JSON (or bodiless) request.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        caller: Option<Caller>,
    ) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        if body.is_some() {
            req = req.header(header::CONTENT_TYPE, "application/json");
        }
        req = with_caller(req, caller);

        let body = body
            .map(|b| Body::from(serde_json::to_vec(&b).expect("Failed to serialize body")))
            .unwrap_or_else(Body::empty);
        self.send(req.body(body).expect("Failed to build request")).await
    }

    /// Upload `data` as the multipart `file` field.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        caller: Caller,
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let req = with_caller(
            Request::builder()
                .method("POST")
                .uri("/api/files/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ),
            Some(caller),
        );
        self.send(req.body(Body::from(body)).expect("Failed to build request"))
            .await
    }

    /// Upload a workbook and return the new record's id.
    pub async fn upload_workbook(&self, file_name: &str, data: &[u8], caller: Caller) -> String {
        let response = self
            .upload(
                file_name,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                data,
                caller,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.json);
        response.json["data"]["id"]
            .as_str()
            .expect("No id in upload response")
            .to_string()
    }

    async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024 * 1024)
            .await
            .expect("Failed to read body")
            .to_vec();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            json,
        }
    }
}

fn with_caller(
    mut req: axum::http::request::Builder,
    caller: Option<Caller>,
) -> axum::http::request::Builder {
    if let Some(caller) = caller {
        req = req.header(PRINCIPAL_ID_HEADER, caller.id.to_string());
        if caller.admin {
            req = req.header(PRINCIPAL_ROLE_HEADER, "admin");
        }
    }
    req
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body
    pub bytes: Vec<u8>,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub json: Value,
}

/// Encode rows as an xlsx workbook.
pub fn workbook_bytes(columns: &[&str], rows: Vec<Vec<Cell>>) -> Vec<u8> {
    let table = Table::new(columns.iter().map(|c| c.to_string()).collect(), rows);
    workbook::write_table(&table).expect("Failed to encode workbook")
}

/// `[rate, period, qty]`: two rows in 202501, one in 202502.
pub fn ledger_workbook() -> Vec<u8> {
    workbook_bytes(
        &["rate", "period", "qty"],
        vec![
            vec![Cell::Text("17%".into()), Cell::Text("202501".into()), Cell::Number(5.0)],
            vec![Cell::Text("16%".into()), Cell::Text("202501".into()), Cell::Number(3.0)],
            vec![Cell::Text("13%".into()), Cell::Text("202502".into()), Cell::Number(2.0)],
        ],
    )
}

/// Decode a downloaded workbook.
pub fn read_workbook(bytes: &[u8]) -> Table {
    workbook::read_table(bytes).expect("Failed to decode workbook")
}
