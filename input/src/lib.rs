//! Payload decoding for schema binding.
//!
//! Turns request bodies and query strings into the string-keyed mapping of
//! dynamic values that a schema consumes:
//!
//! - [`from_json`] — a JSON object body.
//! - [`from_form`] / [`from_query`] — `application/x-www-form-urlencoded`
//!   data. Only the first value of a repeated key is kept.
//! - [`decode`] — picks one of the above from a `Content-Type` header and
//!   enforces a body size limit.
//! - [`decode_request`] — reads the query string for body-less methods and
//!   the body otherwise.
//!
//! # Example
//!
//! ```
//! use databind_input::{DEFAULT_BODY_LIMIT, decode};
//!
//! let data = decode(
//!     Some("application/x-www-form-urlencoded; charset=utf-8"),
//!     b"name=Ada&tag=a&tag=b",
//!     DEFAULT_BODY_LIMIT,
//! )
//! .unwrap();
//! assert_eq!(data["name"], "Ada");
//! assert_eq!(data["tag"], "a");
//! ```

mod error;

use serde_json::{Map, Value};
use tracing::debug;

pub use error::{InputError, Result};

/// Default maximum body size accepted by [`decode`]: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1 << 20;

/// Body encodings understood by [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json` or any `+json` media type.
    Json,
    /// `application/x-www-form-urlencoded`.
    Form,
}

impl ContentKind {
    /// Classifies a `Content-Type` header value, ignoring parameters.
    ///
    /// Returns `None` for media types that are neither JSON nor form data.
    pub fn sniff(content_type: &str) -> Option<Self> {
        let media = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if media == "application/json" || media.ends_with("+json") {
            Some(ContentKind::Json)
        } else if media == "application/x-www-form-urlencoded" {
            Some(ContentKind::Form)
        } else {
            None
        }
    }

    /// Guesses the encoding of a body sent without a content type.
    pub fn guess(body: &[u8]) -> Self {
        match body.iter().find(|byte| !byte.is_ascii_whitespace()) {
            Some(b'{') => ContentKind::Json,
            _ => ContentKind::Form,
        }
    }
}

// Same names as `databind_core::kind_of`; this crate does not depend on core.
fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decodes a JSON body whose top level must be an object.
///
/// # Errors
///
/// Returns [`InputError::Json`] for malformed JSON and
/// [`InputError::NotAnObject`] for any other top-level value.
pub fn from_json(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice(body)? {
        Value::Object(map) => Ok(map),
        other => Err(InputError::NotAnObject(kind_of(&other))),
    }
}

/// Decodes a form-encoded body. Later duplicates of a key are discarded.
pub fn from_form(body: &[u8]) -> Map<String, Value> {
    let mut data = Map::new();
    for (key, value) in form_urlencoded::parse(body) {
        data.entry(key.into_owned())
            .or_insert_with(|| Value::String(value.into_owned()));
    }
    data
}

/// Decodes a URL query string, with or without its leading `?`.
pub fn from_query(query: &str) -> Map<String, Value> {
    from_form(query.strip_prefix('?').unwrap_or(query).as_bytes())
}

/// Decodes `body` according to `content_type`.
///
/// Without a content type the encoding is guessed from the body.
///
/// # Errors
///
/// Returns [`InputError::BodyTooLarge`] before decoding when the body
/// exceeds `limit`, [`InputError::UnsupportedContentType`] for other media
/// types, and JSON errors from [`from_json`].
pub fn decode(content_type: Option<&str>, body: &[u8], limit: usize) -> Result<Map<String, Value>> {
    if body.len() > limit {
        return Err(InputError::BodyTooLarge {
            limit,
            actual: body.len(),
        });
    }

    let kind = match content_type {
        Some(content_type) => ContentKind::sniff(content_type)
            .ok_or_else(|| InputError::UnsupportedContentType(content_type.to_string()))?,
        None => ContentKind::guess(body),
    };
    debug!(kind = ?kind, bytes = body.len(), "Decoding payload");

    match kind {
        ContentKind::Json => from_json(body),
        ContentKind::Form => Ok(from_form(body)),
    }
}

/// Decodes the payload of a request.
///
/// `GET`, `HEAD` and `DELETE` requests are read from `query`; every other
/// method is read from `body`.
///
/// # Errors
///
/// As [`decode`].
pub fn decode_request(
    method: &str,
    query: &str,
    content_type: Option<&str>,
    body: &[u8],
    limit: usize,
) -> Result<Map<String, Value>> {
    if ["GET", "HEAD", "DELETE"]
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method))
    {
        return Ok(from_query(query));
    }
    decode(content_type, body, limit)
}
