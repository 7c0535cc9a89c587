//! # portage: Multipart Upload Relay
//!
//! `portage` is a small HTTP service that accepts multipart file uploads from
//! browsers and relays them to Cloudinary. It exists so frontends can offer
//! file uploads without ever holding the Cloudinary API secret: the browser
//! posts the file here, this service signs the request, and the client gets
//! back the public URL of the stored asset.
//!
//! ## Overview
//!
//! The service exposes a single operation: `POST /upload` with a
//! `multipart/form-data` body carrying the file under a part named `file`.
//! The part is streamed to a temp file as it arrives, then forwarded to
//! Cloudinary's signed upload endpoint with automatic resource type
//! detection, so images, video and raw files all work through the same
//! route. The response is a JSON envelope with the asset's public URL and
//! the metadata Cloudinary reported (dimensions, format).
//!
//! ### Request Flow
//!
//! A request to `/upload` first passes the CORS and body size layers, then
//! the multipart stream is parsed and file parts are spooled to disk. The
//! first part named `file` is signed and forwarded to Cloudinary; spool
//! files are removed as soon as the request finishes, on success and
//! failure alike. Errors map to a fixed JSON contract: a missing `file`
//! part is a 400, an unparseable form is a 500 with `"Form parse error"`,
//! and a rejected forward is a 500 with `"Cloudinary upload failed"`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use portage::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = portage::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize telemetry (structured logging and optional OpenTelemetry)
//!     portage::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     // Create and start the application
//!     let app = Application::new(config)?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options. Credentials are
//! usually supplied through the `CLOUDINARY_URL` environment variable.
pub mod api;
pub mod config;
pub mod errors;
mod form;
mod media_host;
mod openapi;
pub mod telemetry;

#[cfg(test)]
mod test;

use crate::config::CorsOrigin;
use crate::media_host::MediaHost;
use crate::openapi::ApiDoc;
use axum::extract::DefaultBodyLimit;
use axum::http::{self, HeaderValue};
use axum::{
    Router,
    routing::{get, post},
};
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{self, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Headroom added on top of the configured file size limit when capping the
/// request body, covering multipart boundaries, part headers and scalar
/// fields. The spooling size check is what produces the 413, this cap is a
/// backstop.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// Holds the loaded configuration and the media host client uploads are
/// forwarded through. Cloning is cheap, the media host sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub media_host: Arc<dyn MediaHost>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    // tower-http wants the Any marker for wildcard origins, not a literal "*"
    let wildcard = cors_config.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
    let mut cors_layer = if wildcard {
        CorsLayer::new().allow_origin(cors::Any)
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origin headers never carry a trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(cors_config.allow_credentials)
    };

    cors_layer = cors_layer
        .allow_methods([http::Method::POST, http::Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE]);

    if let Some(max_age) = cors_config.max_age {
        cors_layer = cors_layer.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors_layer)
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - The upload relay endpoint with its POST-only method fallback
/// - A request body cap sized from the configured file limit
/// - Health check and API documentation routes
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Anything other than POST on /upload gets the contract's 405 body
    let upload_routes = post(api::handlers::uploads::relay_upload).fallback(api::handlers::uploads::method_not_allowed);

    // Cap the body just above the file limit so boundaries and scalar fields
    // don't push a maximal file over the edge
    let body_limit = if state.config.upload.max_file_size == 0 {
        DefaultBodyLimit::disable()
    } else {
        DefaultBodyLimit::max(state.config.upload.max_file_size as usize + MULTIPART_OVERHEAD)
    };

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/upload", upload_routes.layer(body_limit))
        .fallback(api::handlers::uploads::not_found)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application object.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the media host client and the
///    router from a validated configuration
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts
///    handling requests
/// 3. **Shutdown**: when the shutdown signal resolves, in-flight requests
///    drain and telemetry is flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting upload relay with configuration: {:#?}", config);

        let media_host = media_host::create_media_host(&config.cloudinary);

        let app_state = AppState {
            config: config.clone(),
            media_host,
        };

        let router = build_router(&app_state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Upload relay listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Shutdown telemetry
        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
