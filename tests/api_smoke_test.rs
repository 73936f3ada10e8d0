mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{read_json, TestApp};

#[tokio::test]
async fn health_reports_database() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}

#[tokio::test]
async fn status_reports_service_and_numbering() {
    let app = TestApp::new().await;

    let body = read_json(app.request(Method::GET, "/api/status", None).await).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["service"], "repairdesk-api");
    assert_eq!(body["data"]["environment"], "test");
    assert_eq!(body["data"]["numbering_strategy"], "counter");
}

#[tokio::test]
async fn caller_request_id_is_echoed_in_headers_and_bodies() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/maintenance/requests/999")
        .header("x-request-id", "desk-42")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "desk-42");
    let body = read_json(response).await;
    assert_eq!(body["request_id"], "desk-42");
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/maintenance/technicians", None)
        .await;

    let header = response.headers()["x-request-id"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(!header.is_empty());
    let body = read_json(response).await;
    assert_eq!(body["meta"]["request_id"], header.as_str());
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/maintenance/technicians")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(read_json(response).await["errors"]["body"].is_array());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = read_json(response).await;
    assert!(doc["paths"]["/productpos/checkout"].is_object());
}
