//! Test utilities for integration testing

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use url::Url;

use crate::config::{CloudinaryConfig, Config};

/// Path the mocked Cloudinary expects uploads on, derived from the test
/// credentials in [`create_test_config`]
pub const UPLOAD_PATH: &str = "/v1_1/demo/auto/upload";

/// Config wired to a mock Cloudinary endpoint with test credentials
pub fn create_test_config(mock_uri: &str) -> Config {
    Config {
        cloudinary: CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key123".to_string(),
            api_secret: "secret456".to_string(),
            upload_prefix: Url::parse(mock_uri).expect("mock server uri should parse"),
        },
        ..Config::default()
    }
}

/// Install the process-wide rustls crypto provider, as `main` does before
/// building any TLS-capable client. Ignores the error when another test
/// already installed it.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Boot the full application against the given config and hand back a test server
pub fn create_test_app(config: Config) -> TestServer {
    install_crypto_provider();
    crate::Application::new(config)
        .expect("Failed to create application")
        .into_test_server()
}

/// Multipart form with a single PNG file part named `file`
pub fn png_upload_form(file_name: &str, bytes: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part("file", Part::bytes(bytes.to_vec()).file_name(file_name).mime_type("image/png"))
}

/// Canned Cloudinary success body for mocked uploads
pub fn descriptor_json() -> serde_json::Value {
    serde_json::json!({
        "public_id": "abc123",
        "secure_url": "https://x/y.png",
        "width": 100,
        "height": 50,
        "format": "png",
        "bytes": 8,
        "resource_type": "image"
    })
}
