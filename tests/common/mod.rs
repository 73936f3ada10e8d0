#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use repairdesk_api::{config::AppConfig, db, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "repairdesk-test-boundary";

/// One part of a multipart form
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Full router over a fresh SQLite file and image directory, both removed on drop.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Lets a test adjust the configuration before the app is built.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("repairdesk_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.storage_dir = dir.path().join("storage");
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = repairdesk_api::app_router(state.clone());

        Self { router, state, dir }
    }

    pub fn storage_dir(&self) -> std::path::PathBuf {
        self.state.config.storage_dir.clone()
    }

    /// Send a request with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Send a `multipart/form-data` request.
    pub async fn multipart(&self, method: Method, uri: &str, parts: &[Part<'_>]) -> Response {
        let mut body: Vec<u8> = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, file_name, content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .expect("failed to build multipart request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn create_technician(&self, name: &str) -> i64 {
        let response = self
            .request(
                Method::POST,
                "/maintenance/technicians",
                Some(json!({"name": name, "specialty": "Computer"})),
            )
            .await;
        assert_eq!(response.status(), 201);
        read_json(response).await["data"]["id"]
            .as_i64()
            .expect("technician id")
    }

    /// Creates a request and returns its `data` object.
    pub async fn create_request(&self, customer: &str, technician_id: Option<i64>) -> Value {
        let response = self
            .request(
                Method::POST,
                "/maintenance/requests",
                Some(json!({
                    "customer_name": customer,
                    "customer_phone": "0812345678",
                    "description": "Screen flickers",
                    "category": "computer",
                    "technician_id": technician_id,
                })),
            )
            .await;
        assert_eq!(response.status(), 201);
        read_json(response).await["data"].clone()
    }

    /// Bills a request with the labor-and-part example and returns the invoice `data`.
    pub async fn create_invoice(&self, request_id: i64) -> Value {
        let response = self
            .request(
                Method::POST,
                "/maintenance/invoices",
                Some(json!({
                    "request_id": request_id,
                    "issue_date": "2025-06-01",
                    "due_date": "2025-06-15",
                    "items": [
                        {"description": "labor", "quantity": 2, "unit_price": 150.00},
                        {"description": "part", "quantity": 1, "unit_price": 99.50}
                    ]
                })),
            )
            .await;
        assert_eq!(response.status(), 201);
        read_json(response).await["data"].clone()
    }
}

pub async fn read_body(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes()
        .to_vec()
}

pub async fn read_json(response: Response) -> Value {
    let bytes = read_body(response).await;
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

pub async fn read_text(response: Response) -> String {
    String::from_utf8(read_body(response).await).expect("response body is UTF-8")
}

/// Splits `PREFIX-YYYYMMDD-NNNN` and returns the ordinal.
pub fn sequence_of(number: &str, prefix: &str) -> u32 {
    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts.len(), 3, "unexpected number {}", number);
    assert_eq!(parts[0], prefix);
    assert_eq!(parts[1].len(), 8);
    assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
    assert!(parts[2].len() >= 4);
    parts[2].parse().expect("numeric ordinal")
}
