//! API Integration Tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cvx_api::{create_router_for_testing, testing};
use cvx_core::{AppConfig, EntityPolicy, NerBackend};
use docx_rs::{Docx, Paragraph, Run};
use serde_json::{json, Value};
use std::io::Cursor;
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn docx_base64(lines: &[&str]) -> String {
    let mut doc = Docx::new();
    for line in lines {
        doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)));
    }
    let mut buf = Cursor::new(Vec::new());
    doc.build().pack(&mut buf).unwrap();
    STANDARD.encode(buf.into_inner())
}

fn resume_base64() -> String {
    docx_base64(&[
        "Jane Smith",
        "jane.smith@example.com",
        "Phone: 555-123-4567",
        "Master of Science in Data Analysis",
        "Built a recommendation engine with Machine Learning",
    ])
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (status, json) = send(
        create_router_for_testing(),
        create_json_request("GET", "/health", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let (status, json) = send(
        create_router_for_testing(),
        create_json_request("GET", "/ready", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["ner_model"], true);
    assert_eq!(json["checks"]["ner_pretrained"], false);
    assert_eq!(json["checks"]["entity_policy"], "degrade");
    assert_eq!(json["checks"]["webhook_configured"], false);
}

#[tokio::test]
async fn test_not_ready_when_model_missing_under_abort() {
    let mut config = AppConfig::default();
    config.extraction.ner_model_dir = Some("/nonexistent/bert-base-NER".into());
    config.extraction.entity_policy = EntityPolicy::Abort;
    let app = testing::router_with(testing::state(config));

    let (status, json) = send(app, create_json_request("GET", "/ready", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"]["ner_model"], false);
}

#[tokio::test]
async fn test_openapi_document() {
    let (status, json) = send(
        create_router_for_testing(),
        create_json_request("GET", "/api-docs/openapi.json", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v1/cv"].is_object());
    assert!(json["paths"]["/health"].is_object());
}

// =============================================================================
// CV Processing Tests
// =============================================================================

#[tokio::test]
async fn test_process_docx() {
    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "jane_smith.docx",
            "content": resume_base64(),
        })),
    );

    let (status, json) = send(create_router_for_testing(), request).await;
    assert_eq!(status, StatusCode::OK);

    let record = &json["record"];
    assert_eq!(json["file_name"], "jane_smith.docx");
    assert!(json["id"].is_string());
    assert!(json["dispatch"].is_null());
    // Without a pretrained model the lexicon fallback finds the person,
    // but the name still comes from the first line
    assert_eq!(record["name"], "Jane Smith");
    assert_eq!(record["name_source"], "first_line");
    assert_eq!(record["email"], "jane.smith@example.com");
    assert_eq!(record["phone"], "555-123-4567");
    assert_eq!(record["education"][0], "Master of Science in Data Analysis");
    assert_eq!(
        record["projects"][0],
        "Built a recommendation engine with Machine Learning"
    );
    assert_eq!(record["skills"], json!(["Machine Learning", "Data Analysis"]));
    assert_eq!(record["entities"]["PERSON"][0], "Jane Smith");
}

#[tokio::test]
async fn test_explicit_file_type_wins() {
    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "upload.bin",
            "file_type": "docx",
            "content": resume_base64(),
        })),
    );

    let (status, _) = send(create_router_for_testing(), request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unsupported_format() {
    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "notes.txt",
            "content": STANDARD.encode("Jane Smith"),
        })),
    );

    let (status, json) = send(create_router_for_testing(), request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn test_corrupt_document() {
    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "broken.docx",
            "content": STANDARD.encode("this is not a zip archive"),
        })),
    );

    let (status, json) = send(create_router_for_testing(), request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "EXTRACTION_FAILURE");
}

#[tokio::test]
async fn test_invalid_base64() {
    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "cv.pdf",
            "content": "%%% not base64 %%%",
        })),
    );

    let (status, json) = send(create_router_for_testing(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_missing_extension_without_type() {
    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "resume",
            "content": resume_base64(),
        })),
    );

    let (status, _) = send(create_router_for_testing(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_limit() {
    let mut config = AppConfig::default();
    config.server.max_upload_bytes = 16;
    let app = testing::router_with(testing::state(config));

    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "cv.pdf",
            "content": STANDARD.encode([0u8; 64]),
        })),
    );

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_oversized_body_gets_json_error() {
    let mut config = AppConfig::default();
    config.server.max_upload_bytes = 16;
    let app = testing::router_with(testing::state(config));

    let body = serde_json::to_string(&json!({
        "file_name": "cv.pdf",
        "content": "A".repeat(128 * 1024),
    }))
    .unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/cv")
        .header("Content-Type", "application/json")
        .header("Content-Length", body.len())
        .body(Body::from(body))
        .unwrap();

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_degrades_when_lexicon_missing() {
    let mut config = AppConfig::default();
    config.extraction.ner_backend = NerBackend::Lexicon;
    config.extraction.ner_model_path = Some("/nonexistent/model.json".into());
    let app = testing::router_with(testing::state(config));

    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "jane_smith.docx",
            "content": resume_base64(),
        })),
    );

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["record"]["name"], "Jane Smith");
    assert_eq!(json["record"]["name_source"], "first_line");
    assert_eq!(json["record"]["entities"], json!({}));
}

#[tokio::test]
async fn test_abort_when_model_missing() {
    let mut config = AppConfig::default();
    config.extraction.ner_model_dir = Some("/nonexistent/bert-base-NER".into());
    config.extraction.entity_policy = EntityPolicy::Abort;
    let app = testing::router_with(testing::state(config));

    let request = create_json_request(
        "POST",
        "/api/v1/cv",
        Some(json!({
            "file_name": "jane_smith.docx",
            "content": resume_base64(),
        })),
    );

    let (status, json) = send(app, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "MODEL_UNAVAILABLE");
}
