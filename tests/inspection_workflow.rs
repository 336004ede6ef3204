//! End-to-end inspection workflow
//!
//! Register, evaluate, save with a reaction, read the inspection back,
//! download the PDF, log out. Runs against the in-process app with an
//! assistant that fails every request, so suggestions degrade.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use machinery_qa::api::{create_app, ApiState};
use machinery_qa::config::{QaConfig, ServerConfig};
use machinery_qa::llm::{ChatCompletionsClient, DisabledAssistant};
use machinery_qa::report::PdfReportRenderer;
use machinery_qa::service::InspectionService;
use machinery_qa::storage::Database;

async fn call(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Vec<u8>, Option<String>) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec(), content_type)
}

async fn call_json(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes, _) = call(app, method, uri, token, body).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn open_session(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/api/v1/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&bytes).unwrap();
    v["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_full_failed_inspection_flow() {
    let reports = tempfile::tempdir().unwrap();
    let db = Database::in_memory().await.unwrap();
    db.initialize(true).await.unwrap();

    // Unreachable endpoint: every assistant call fails at the transport.
    let assistant_config = machinery_qa::config::AssistantConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        ..Default::default()
    };
    let assistant = ChatCompletionsClient::new(&assistant_config, "test-key").unwrap();

    let service = InspectionService::new(
        db,
        4,
        Arc::new(assistant),
        Arc::new(PdfReportRenderer::new(reports.path())),
    );
    let app = create_app(ApiState::new(service), &ServerConfig::default());
    let token = open_session(&app).await;

    call_json(&app, "POST", "/api/v1/auth/register/begin", &token, None).await;
    let (status, _) = call_json(
        &app,
        "POST",
        "/api/v1/auth/register",
        &token,
        Some(json!({"username": "inspector", "password": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Temperature in spec, Pressure near the upper bound, Vibration out of spec.
    let (status, v) = call_json(
        &app,
        "POST",
        "/api/v1/inspections/evaluate",
        &token,
        Some(json!({"machine_id": 1, "shift": "Night", "values": [29.0, 215.0, 5.6]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let lines = v["data"]["lines"].as_array().unwrap();
    assert_eq!(lines[0]["classification"], "InSpec");
    assert_eq!(lines[0]["color"], "green");
    assert_eq!(lines[1]["classification"], "NearBoundary");
    assert_eq!(lines[1]["color"], "yellow");
    assert_eq!(lines[2]["classification"], "OutOfSpec");
    assert_eq!(lines[2]["color"], "red");
    assert_eq!(v["data"]["status"], "Fail");

    let (status, v) = call_json(
        &app,
        "POST",
        "/api/v1/inspections",
        &token,
        Some(json!({"reaction": "Spindle bearing replaced"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{v}");
    let id = v["data"]["inspection_id"].as_i64().unwrap();
    assert_eq!(v["data"]["status"], "Fail");
    assert_eq!(v["data"]["reaction_saved"], true);
    assert!(v["data"]["suggestions"].is_null());
    assert!(v["data"]["report"]["path"].as_str().unwrap().ends_with(&format!("report_{id}.pdf")));

    // Pending form is consumed by the save.
    let (status, _) = call_json(&app, "POST", "/api/v1/inspections", &token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, v) = call_json(&app, "GET", &format!("/api/v1/inspections/{id}"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["machine_name"], "Machine A");
    assert_eq!(v["data"]["inspection"]["shift"], "Night");
    assert_eq!(v["data"]["inspection"]["measurements"][1]["value"], 215.0);
    assert_eq!(v["data"]["inspection"]["measurements"][1]["max"], 200.0);
    assert_eq!(v["data"]["reaction"]["text"], "Spindle bearing replaced");

    let (status, bytes, content_type) =
        call(&app, "GET", &format!("/api/v1/inspections/{id}/report"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert!(bytes.starts_with(b"%PDF"));

    // Chat failures surface as 503.
    let (status, v) = call_json(&app, "POST", "/api/v1/chat", &token, Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["error"]["code"], "SERVICE_UNAVAILABLE");

    let (status, v) = call_json(&app, "POST", "/api/v1/auth/logout", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["state"], "LoggedOut");

    let (status, _) = call_json(&app, "GET", &format!("/api/v1/inspections/{id}"), &token, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_report_file_is_re_rendered() {
    let reports = tempfile::tempdir().unwrap();
    let db = Database::in_memory().await.unwrap();
    db.initialize(true).await.unwrap();
    let service = InspectionService::new(
        db,
        4,
        Arc::new(DisabledAssistant),
        Arc::new(PdfReportRenderer::new(reports.path())),
    );
    let app = create_app(ApiState::new(service), &ServerConfig::default());
    let token = open_session(&app).await;

    call_json(&app, "POST", "/api/v1/auth/register/begin", &token, None).await;
    call_json(
        &app,
        "POST",
        "/api/v1/auth/register",
        &token,
        Some(json!({"username": "qa", "password": "pw"})),
    )
    .await;
    call_json(
        &app,
        "POST",
        "/api/v1/inspections/evaluate",
        &token,
        Some(json!({"machine_id": 1, "shift": "Morning", "values": [25.0, 150.0, 2.0]})),
    )
    .await;
    let (_, v) = call_json(&app, "POST", "/api/v1/inspections", &token, Some(json!({"reaction": "n/a"}))).await;
    let id = v["data"]["inspection_id"].as_i64().unwrap();
    assert_eq!(v["data"]["status"], "Pass");
    assert_eq!(v["data"]["reaction_saved"], false);

    std::fs::remove_file(reports.path().join(format!("report_{id}.pdf"))).unwrap();

    let (status, bytes, _) = call(&app, "GET", &format!("/api/v1/inspections/{id}/report"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));
    assert!(reports.path().join(format!("report_{id}.pdf")).exists());
}

#[test]
fn test_default_config_is_valid() {
    let config = QaConfig::default();
    config.validate().unwrap();
    assert_eq!(config.server.addr, "127.0.0.1:8501");
}
