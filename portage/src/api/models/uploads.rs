use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::media_host::AssetDescriptor;

/// Successful upload relay response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Fixed confirmation message
    pub message: String,
    /// Public HTTPS URL of the stored asset
    pub url: String,
    /// Identifier Cloudinary assigned to the asset
    #[serde(rename = "cloudinaryId")]
    pub cloudinary_id: String,
    /// Pixel width, present for image and video assets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height, present for image and video assets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Stored format as reported by Cloudinary, e.g. "png"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

impl UploadResponse {
    /// Build the response from the media host's asset descriptor
    pub fn from_descriptor(descriptor: &AssetDescriptor) -> Self {
        Self {
            message: "File uploaded!".to_string(),
            url: descriptor.secure_url.clone(),
            cloudinary_id: descriptor.public_id.clone(),
            width: descriptor.width,
            height: descriptor.height,
            mimetype: descriptor.format.clone(),
        }
    }
}

/// Error response body shared by all failure modes
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// User-safe description of the failure
    pub error: String,
    /// Summarized reason from the media host, when enabled in config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
