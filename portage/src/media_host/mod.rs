//! Media host abstraction layer
//!
//! This module defines the `MediaHost` trait which abstracts remote media storage
//! providers. The relay spools an uploaded file to local disk and hands the path
//! to a `MediaHost` implementation, which forwards the bytes and reports back the
//! stored asset.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::CloudinaryConfig;

pub mod cloudinary;
pub mod signing;

/// Create a media host client from configuration
///
/// This is the single point where we convert config into client instances.
/// Adding a new provider requires adding a constructor here.
pub fn create_media_host(config: &CloudinaryConfig) -> Arc<dyn MediaHost> {
    Arc::new(cloudinary::CloudinaryClient::new(config.clone()))
}

/// Result type for media host operations
pub type Result<T> = std::result::Result<T, MediaHostError>;

/// Errors that can occur while forwarding an upload to a media host
#[derive(Debug, thiserror::Error)]
pub enum MediaHostError {
    /// The provider accepted the request and answered with an error
    #[error("{0}")]
    Api(String),

    /// The request never completed (DNS, connect, TLS, broken stream, ...)
    #[error("Upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Reading the spooled file failed
    #[error("Failed to read spooled upload: {0}")]
    Io(#[from] std::io::Error),

    /// The provider answered with a success status but a body we could not understand
    #[error("Unexpected media host response: {0}")]
    InvalidResponse(String),
}

/// Options for a single forwarded upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Logical folder the asset is filed under on the host
    pub folder: String,
    /// Original filename as declared by the uploading client
    pub file_name: Option<String>,
    /// Declared content type of the file part
    pub content_type: Option<String>,
    /// Size of the spooled file in bytes
    pub size_bytes: u64,
}

/// Snapshot of a stored asset as reported by the media host.
///
/// Width, height and format are absent for assets the host classifies as raw
/// (anything it could not probe as an image or video).
#[derive(Debug, Clone, Deserialize)]
pub struct AssetDescriptor {
    /// Provider-assigned public identifier
    pub public_id: String,
    /// HTTPS delivery URL for the stored asset
    pub secure_url: String,
    /// Pixel width, for visual assets
    pub width: Option<u32>,
    /// Pixel height, for visual assets
    pub height: Option<u32>,
    /// Stored format (e.g. "png"), for visual assets
    pub format: Option<String>,
    /// Stored size in bytes
    pub bytes: Option<u64>,
    /// Provider resource class ("image", "video", "raw")
    pub resource_type: Option<String>,
}

/// Abstract media host interface
///
/// Implementors forward a locally spooled file to a remote storage provider.
/// A call makes exactly one attempt; there is no retry at this layer.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload the file at `path` and return the stored asset's descriptor
    async fn upload(&self, path: &Path, options: &UploadOptions) -> Result<AssetDescriptor>;
}
