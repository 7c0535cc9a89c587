//! API request and response data models.
//!
//! These structures define the public JSON contract of the relay. They are
//! distinct from the media host's wire types so the two can evolve
//! independently, and all of them carry `utoipa` annotations for the
//! generated API docs.

pub mod uploads;
