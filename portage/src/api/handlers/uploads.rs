use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::Uri;

use crate::api::models::uploads::{ErrorResponse, UploadResponse};
use crate::errors::{Error, Result};
use crate::form::parse_upload_form;
use crate::media_host::{MediaHostError, UploadOptions};
use crate::AppState;

#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    summary = "Upload file",
    description = "Accepts a multipart form carrying a file part named 'file' and relays it to the configured media host. \
                   Other parts are tolerated and ignored.",
    request_body(
        content_type = "multipart/form-data",
        description = "Multipart form with the file under a part named 'file'"
    ),
    responses(
        (status = 200, description = "File relayed successfully", body = UploadResponse),
        (status = 400, description = "No file part named 'file'", body = ErrorResponse),
        (status = 413, description = "Payload exceeds the configured size limit", body = ErrorResponse),
        (status = 500, description = "Unparseable form or media host failure", body = ErrorResponse)
    )
)]
pub async fn relay_upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    // A request that isn't multipart/form-data fails at extraction, before
    // routing ever sees a form
    let multipart = multipart.map_err(|rejection| Error::FormParse {
        message: rejection.body_text(),
    })?;

    let form = parse_upload_form(multipart, &state.config.upload).await?;

    let Some(part) = form.file_by_name("file") else {
        tracing::warn!(
            scalar_fields = form.fields.len(),
            file_parts = form.files.len(),
            "Upload form arrived without a 'file' part"
        );
        return Err(Error::MissingFile);
    };

    if form.files.len() > 1 {
        tracing::debug!(
            file_parts = form.files.len(),
            "Multiple file parts received, forwarding the first part named 'file'"
        );
    }

    let options = UploadOptions {
        folder: state.config.upload.folder.clone(),
        file_name: part.file_name.clone(),
        content_type: part.content_type.clone(),
        size_bytes: part.size_bytes,
    };

    tracing::info!(
        file_name = ?part.file_name,
        content_type = ?part.content_type,
        size_bytes = part.size_bytes,
        "Relaying upload to media host"
    );

    let descriptor = match state.media_host.upload(part.file.path(), &options).await {
        Ok(descriptor) => descriptor,
        Err(e) => {
            // The full provider error always lands in the logs; the response
            // only ever carries the summarized API message, and only when
            // configured to
            tracing::error!(error = %e, file_name = ?part.file_name, "Media host upload failed");
            let details = match &e {
                MediaHostError::Api(message) if state.config.upload.expose_provider_error_details => Some(message.clone()),
                _ => None,
            };
            return Err(Error::RemoteUpload { details });
        }
    };

    tracing::info!(
        public_id = %descriptor.public_id,
        url = %descriptor.secure_url,
        size_bytes = part.size_bytes,
        "Upload relayed successfully"
    );

    Ok(Json(UploadResponse::from_descriptor(&descriptor)))
}

/// Fallback for `/upload` requests using any verb other than POST.
pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

/// Fallback for paths no route matches.
pub async fn not_found(uri: Uri) -> Error {
    Error::NotFound {
        path: uri.path().to_string(),
    }
}
