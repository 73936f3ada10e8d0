mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_trims_and_drops_blank_fields() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/maintenance/technicians",
            Some(json!({"name": "  Prasert  ", "specialty": "Phones", "contact": "   "})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Prasert");
    assert_eq!(body["data"]["specialty"], "Phones");
    assert!(body["data"]["contact"].is_null());
}

#[tokio::test]
async fn empty_name_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/maintenance/technicians",
            Some(json!({"name": ""})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(read_json(response).await["errors"]["name"].is_array());
}

#[tokio::test]
async fn whitespace_name_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/maintenance/technicians",
            Some(json!({"name": "   ", "specialty": "Refrigerator"})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(response).await["errors"]["name"][0], "must not be blank");

    let listed = read_json(app.request(Method::GET, "/maintenance/technicians", None).await).await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_and_show_technicians() {
    let app = TestApp::new().await;
    let first = app.create_technician("Somchai").await;
    app.create_technician("Saijai").await;

    let listed = read_json(app.request(Method::GET, "/maintenance/technicians", None).await).await;
    let names: Vec<&str> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Somchai", "Saijai"]);

    let shown = read_json(
        app.request(
            Method::GET,
            &format!("/maintenance/technicians/{}", first),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(shown["data"]["id"], first);
    assert_eq!(shown["data"]["specialty"], "Computer");
}

#[tokio::test]
async fn unknown_technician_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/maintenance/technicians/99", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["message"], "Technician 99 not found");

    let response = app
        .request(Method::DELETE, "/maintenance/technicians/99", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_technician_unassigns_their_requests() {
    let app = TestApp::new().await;
    let technician = app.create_technician("Wichai").await;
    let assigned = app.create_request("Somsak", Some(technician)).await;
    let other = app.create_request("Malee", None).await;
    assert_eq!(assigned["technician"]["name"], "Wichai");

    let response = app
        .request(
            Method::DELETE,
            &format!("/maintenance/technicians/{}", technician),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await["message"],
        "Technician deleted successfully; 1 request(s) unassigned"
    );

    let request = read_json(
        app.request(
            Method::GET,
            &format!("/maintenance/requests/{}", assigned["id"]),
            None,
        )
        .await,
    )
    .await;
    assert!(request["data"]["technician_id"].is_null());
    assert!(request["data"]["technician"].is_null());
    assert_eq!(request["data"]["status"], "pending");

    let untouched = app
        .request(
            Method::GET,
            &format!("/maintenance/requests/{}", other["id"]),
            None,
        )
        .await;
    assert_eq!(untouched.status(), StatusCode::OK);

    let listed = read_json(app.request(Method::GET, "/maintenance/technicians", None).await).await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}
