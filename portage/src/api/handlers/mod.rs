//! HTTP request handlers.
//!
//! - [`uploads`]: the multipart upload relay endpoint, plus the method and
//!   route fallbacks that keep its error contract
//!
//! Handlers return [`crate::errors::Error`] on failure; its `IntoResponse`
//! impl maps each variant to the documented status code and JSON body.

pub mod uploads;
