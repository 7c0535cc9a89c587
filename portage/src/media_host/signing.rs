//! Request signing for the Cloudinary upload API.
//!
//! Cloudinary authenticates uploads with the following scheme:
//! - The parameters to sign are serialized as `key=value` pairs, sorted
//!   alphabetically by key and joined with `&`
//! - Parameters with empty values are excluded from the serialization
//! - The API secret is appended to the serialized string and the whole
//!   thing is hashed (SHA-256 here)
//! - The signature is the lowercase hex digest, sent as the `signature`
//!   form field alongside `api_key` and `timestamp`
//!
//! See: <https://cloudinary.com/documentation/authentication_signatures>

use sha2::{Digest, Sha256};

/// Compute the `signature` form field for a signed upload.
///
/// `params` holds the parameters that take part in signing (`timestamp`,
/// `folder`, ...). `api_key`, `signature` and the file payload itself never
/// take part. Parameter order does not matter.
pub fn api_sign_request(params: &[(&str, String)], api_secret: &str) -> String {
    let mut entries: Vec<&(&str, String)> = params.iter().filter(|(_, value)| !value.is_empty()).collect();
    entries.sort_by_key(|(key, _)| *key);

    let serialized = entries
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{serialized}{api_secret}").as_bytes()))
}
