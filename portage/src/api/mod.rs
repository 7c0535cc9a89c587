//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for the upload relay
//! - **[`models`]**: Request/response data structures for API communication
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`.
//! The rendered documentation is available at `/docs` when the server is
//! running.

pub mod handlers;
pub mod models;
