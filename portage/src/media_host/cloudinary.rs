//! Cloudinary implementation of the media host interface.
//!
//! Uploads go to the signed upload endpoint,
//! `POST {upload_prefix}/v1_1/{cloud_name}/auto/upload`, as a multipart body
//! carrying the credentials, signature and file bytes. The `auto` resource
//! type lets Cloudinary classify images, video and raw files on its own.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use super::signing;
use super::{AssetDescriptor, MediaHost, MediaHostError, Result, UploadOptions};
use crate::config::CloudinaryConfig;

/// Client for the Cloudinary upload API.
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: CloudinaryConfig,
}

/// Error body shape Cloudinary uses for rejected requests
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

impl CloudinaryClient {
    /// Create a new client.
    ///
    /// No overall request timeout is set: forwarding a large upload can
    /// legitimately take minutes, and deadlines are left to the platform.
    pub fn new(config: CloudinaryConfig) -> Self {
        let http = reqwest::Client::builder()
            .build()
            .expect("Failed to create Cloudinary HTTP client");
        Self { http, config }
    }

    /// Endpoint for signed uploads with automatic resource type detection
    fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/auto/upload",
            self.config.upload_prefix.as_str().trim_end_matches('/'),
            self.config.cloud_name
        )
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, path: &Path, options: &UploadOptions) -> Result<AssetDescriptor> {
        let timestamp = Utc::now().timestamp().to_string();

        // api_key and the file itself never take part in signing
        let signed_params = [("folder", options.folder.clone()), ("timestamp", timestamp.clone())];
        let signature = signing::api_sign_request(&signed_params, &self.config.api_secret);

        let file = tokio::fs::File::open(path).await?;
        let mut file_part = Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(file)), options.size_bytes);
        if let Some(file_name) = &options.file_name {
            file_part = file_part.file_name(file_name.clone());
        }
        if let Some(content_type) = &options.content_type {
            file_part = file_part.mime_str(content_type)?;
        }

        let form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("folder", options.folder.clone())
            .part("file", file_part);

        let url = self.upload_url();
        tracing::debug!(
            url = %url,
            folder = %options.folder,
            size_bytes = options.size_bytes,
            "Forwarding upload to Cloudinary"
        );

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            // Rejections that reached the API carry {"error": {"message": "..."}}
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(MediaHostError::Api(message));
        }

        let descriptor: AssetDescriptor = response
            .json()
            .await
            .map_err(|e| MediaHostError::InvalidResponse(format!("upload response did not parse as an asset descriptor: {e}")))?;

        tracing::debug!(
            public_id = %descriptor.public_id,
            resource_type = ?descriptor.resource_type,
            "Cloudinary accepted upload"
        );

        Ok(descriptor)
    }
}
