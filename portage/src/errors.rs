use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Upload route hit with a method other than POST
    #[error("Only POST allowed")]
    MethodNotAllowed,

    /// Multipart body could not be parsed into a form
    #[error("Failed to parse upload form: {message}")]
    FormParse { message: String },

    /// Form parsed cleanly but carried no part named `file`
    #[error("No file part named 'file' in upload form")]
    MissingFile,

    /// The media host rejected or failed the forwarded upload
    #[error("Cloudinary upload failed")]
    RemoteUpload { details: Option<String> },

    /// Spooled upload bytes exceeded the configured limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// No route matched the request path
    #[error("No route for {path}")]
    NotFound { path: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            // The upload contract reports parse failures as a server-side
            // error, not a 400
            Error::FormParse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::MissingFile => StatusCode::BAD_REQUEST,
            Error::RemoteUpload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::MethodNotAllowed => "Only POST allowed".to_string(),
            Error::FormParse { .. } => "Form parse error".to_string(),
            Error::MissingFile => "No file uploaded. Field name should be 'file'.".to_string(),
            Error::RemoteUpload { .. } => "Cloudinary upload failed".to_string(),
            Error::PayloadTooLarge { message } => message.clone(),
            Error::NotFound { .. } => "Not found".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Internal { .. } | Error::RemoteUpload { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::FormParse { .. } => {
                tracing::warn!("Upload form rejected: {}", self);
            }
            Error::MethodNotAllowed | Error::MissingFile | Error::PayloadTooLarge { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        let mut body = serde_json::json!({ "error": self.user_message() });
        if let Error::RemoteUpload { details: Some(details) } = &self {
            body["details"] = serde_json::Value::String(details.clone());
        }

        (status, axum::response::Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
