//! End-to-end tests for the upload relay.
//!
//! Each test boots the full application against a wiremock stand-in for
//! Cloudinary and drives it over HTTP with axum-test, asserting on the
//! public JSON contract.

pub mod utils;

use axum::http::{Method, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::CorsOrigin;
use utils::{UPLOAD_PATH, create_test_app, create_test_config, descriptor_json, png_upload_form};

#[tokio::test]
async fn test_upload_relays_file_and_returns_envelope() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(descriptor_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server.post("/upload").multipart(png_upload_form("cat.png", b"pngbytes")).await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(
        body,
        serde_json::json!({
            "message": "File uploaded!",
            "url": "https://x/y.png",
            "cloudinaryId": "abc123",
            "width": 100,
            "height": 50,
            "mimetype": "png"
        })
    );

    // The forwarded request must carry the original bytes and filename
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let forwarded = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(forwarded.contains("filename=\"cat.png\""));
    assert!(forwarded.contains("pngbytes"));
    assert!(forwarded.contains("name=\"signature\""));
}

#[tokio::test]
async fn test_upload_without_file_part_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&mock_server).await;

    let server = create_test_app(create_test_config(&mock_server.uri()));

    let form = MultipartForm::new().add_text("comment", "no file here");
    let response = server.post("/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body, serde_json::json!({ "error": "No file uploaded. Field name should be 'file'." }));
}

#[tokio::test]
async fn test_upload_with_wrong_field_name_is_rejected() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&mock_server).await;

    let server = create_test_app(create_test_config(&mock_server.uri()));

    // File arrives under "document" rather than "file"
    let form = MultipartForm::new().add_part("document", Part::bytes(b"data".to_vec()).file_name("doc.pdf").mime_type("application/pdf"));
    let response = server.post("/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "No file uploaded. Field name should be 'file'.");
}

#[tokio::test]
async fn test_non_post_methods_are_rejected() {
    let mock_server = MockServer::start().await;
    let server = create_test_app(create_test_config(&mock_server.uri()));

    for verb in [Method::GET, Method::PUT, Method::DELETE] {
        let response = server.method(verb.clone(), "/upload").await;
        assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED, "verb {verb} should be refused");
        let body: Value = response.json();
        assert_eq!(body, serde_json::json!({ "error": "Only POST allowed" }));
    }
}

#[tokio::test]
async fn test_non_multipart_body_is_a_form_parse_error() {
    let mock_server = MockServer::start().await;
    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server.post("/upload").json(&serde_json::json!({ "hello": "world" })).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body, serde_json::json!({ "error": "Form parse error" }));

    // Same contract for a request with no body at all
    let response = server.post("/upload").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "Form parse error");
}

#[tokio::test]
async fn test_media_host_rejection_returns_contract_error_with_details() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "Invalid Signature" }
        })))
        .mount(&mock_server)
        .await;

    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server.post("/upload").multipart(png_upload_form("cat.png", b"pngbytes")).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(
        body,
        serde_json::json!({
            "error": "Cloudinary upload failed",
            "details": "Invalid Signature"
        })
    );
}

#[tokio::test]
async fn test_provider_details_can_be_suppressed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "Invalid Signature" }
        })))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.upload.expose_provider_error_details = false;
    let server = create_test_app(config);

    let response = server.post("/upload").multipart(png_upload_form("cat.png", b"pngbytes")).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body, serde_json::json!({ "error": "Cloudinary upload failed" }));
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_early() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&mock_server).await;

    let spool_dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri());
    config.upload.max_file_size = 16;
    config.upload.spool_dir = Some(spool_dir.path().to_path_buf());
    let server = create_test_app(config);

    let response = server.post("/upload").multipart(png_upload_form("big.png", &[0u8; 64])).await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("exceeds maximum allowed size of 16 bytes"), "{message}");

    let leftovers: Vec<_> = std::fs::read_dir(spool_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "spool files should be cleaned up: {leftovers:?}");
}

#[tokio::test]
async fn test_size_limit_of_zero_disables_the_cap() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(descriptor_json()))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.upload.max_file_size = 0;
    let server = create_test_app(config);

    let payload = vec![0u8; 1024 * 1024];
    let response = server.post("/upload").multipart(png_upload_form("big.png", &payload)).await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let mock_server = MockServer::start().await;
    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server.get("/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body, serde_json::json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_healthz_reports_ok() {
    let mock_server = MockServer::start().await;
    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server.get("/healthz").await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_api_docs_are_served() {
    let mock_server = MockServer::start().await;
    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server.get("/docs").await;
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_preflight_allows_any_origin_by_default() {
    let mock_server = MockServer::start().await;
    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server
        .method(Method::OPTIONS, "/upload")
        .add_header("origin", "https://app.example.com")
        .add_header("access-control-request-method", "POST")
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.header("access-control-allow-origin"), "*");
    let methods = response.header("access-control-allow-methods");
    let methods = methods.to_str().unwrap();
    assert!(methods.contains("POST"), "{methods}");
    assert!(methods.contains("OPTIONS"), "{methods}");
}

#[tokio::test]
async fn test_configured_origin_is_echoed_in_preflight() {
    let mock_server = MockServer::start().await;
    let mut config = create_test_config(&mock_server.uri());
    config.cors.allowed_origins = vec![CorsOrigin::Url(url::Url::parse("https://app.example.com").unwrap())];
    let server = create_test_app(config);

    let response = server
        .method(Method::OPTIONS, "/upload")
        .add_header("origin", "https://app.example.com")
        .add_header("access-control-request-method", "POST")
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.header("access-control-allow-origin"), "https://app.example.com");
}

#[tokio::test]
async fn test_upload_response_carries_cors_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(descriptor_json()))
        .mount(&mock_server)
        .await;

    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server
        .post("/upload")
        .add_header("origin", "https://app.example.com")
        .multipart(png_upload_form("cat.png", b"pngbytes"))
        .await;

    response.assert_status(StatusCode::OK);
    assert_eq!(response.header("access-control-allow-origin"), "*");
}

#[tokio::test]
async fn test_spool_dir_left_clean_after_relay() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(descriptor_json()))
        .mount(&mock_server)
        .await;

    let spool_dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri());
    config.upload.spool_dir = Some(spool_dir.path().to_path_buf());
    let server = create_test_app(config);

    let response = server.post("/upload").multipart(png_upload_form("cat.png", b"pngbytes")).await;
    response.assert_status(StatusCode::OK);

    let leftovers: Vec<_> = std::fs::read_dir(spool_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "spool files should be cleaned up: {leftovers:?}");
}

#[tokio::test]
async fn test_spool_dir_left_clean_after_remote_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("nope"))
        .mount(&mock_server)
        .await;

    let spool_dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri());
    config.upload.spool_dir = Some(spool_dir.path().to_path_buf());
    let server = create_test_app(config);

    let response = server.post("/upload").multipart(png_upload_form("cat.png", b"pngbytes")).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let leftovers: Vec<_> = std::fs::read_dir(spool_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "spool files should be cleaned up: {leftovers:?}");
}

#[tokio::test]
async fn test_first_file_part_named_file_is_forwarded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(descriptor_json()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let server = create_test_app(create_test_config(&mock_server.uri()));

    let form = MultipartForm::new()
        .add_part("attachment", Part::bytes(b"side".to_vec()).file_name("side.txt").mime_type("text/plain"))
        .add_part("file", Part::bytes(b"first".to_vec()).file_name("first.txt").mime_type("text/plain"))
        .add_part("file", Part::bytes(b"second".to_vec()).file_name("second.txt").mime_type("text/plain"));
    let response = server.post("/upload").multipart(form).await;

    response.assert_status(StatusCode::OK);

    let requests = mock_server.received_requests().await.unwrap();
    let forwarded = String::from_utf8_lossy(&requests[0].body).to_string();
    assert!(forwarded.contains("filename=\"first.txt\""));
    assert!(!forwarded.contains("second.txt"));
    assert!(!forwarded.contains("side.txt"));
}

#[tokio::test]
async fn test_empty_file_is_still_relayed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "public_id": "abc123",
            "secure_url": "https://x/y",
            "bytes": 0,
            "resource_type": "raw"
        })))
        .mount(&mock_server)
        .await;

    let server = create_test_app(create_test_config(&mock_server.uri()));

    let response = server.post("/upload").multipart(png_upload_form("empty.png", b"")).await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "File uploaded!");
    // Metadata Cloudinary didn't report stays out of the envelope
    assert!(body.get("width").is_none());
    assert!(body.get("height").is_none());
    assert!(body.get("mimetype").is_none());
}
