//! OpenAPI documentation configuration.
//!
//! Defines the document describing the relay's public surface. The rendered
//! docs are served with Scalar at `/docs` when the server is running.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Portage",
        description = "A small relay that accepts multipart file uploads and forwards them to Cloudinary."
    ),
    paths(api::handlers::uploads::relay_upload),
    components(schemas(
        api::models::uploads::UploadResponse,
        api::models::uploads::ErrorResponse,
    )),
    tags(
        (name = "uploads", description = "Relay multipart file uploads to the configured media host.")
    )
)]
pub struct ApiDoc;
