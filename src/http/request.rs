//! Request handling.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Decode the `{ "query": "..." }` body and enforce the length cap
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Query length is measured in characters, not bytes

use axum::http::{HeaderValue, Request};
use serde_json::Value;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 for every request lacking an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the request-id layer.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Malformed client input, detected before validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Failed to read request body")]
    UnreadableBody,

    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("Missing or invalid query parameter")]
    MissingQuery,

    #[error("Query too large")]
    QueryTooLarge { max: usize },
}

/// Extract the query string from a JSON request body.
pub fn parse_query(body: &[u8], max_length: usize) -> Result<String, InputError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| InputError::InvalidJson)?;

    let query = match value {
        Value::Object(mut map) => match map.remove("query") {
            Some(Value::String(query)) if !query.is_empty() => query,
            _ => return Err(InputError::MissingQuery),
        },
        _ => return Err(InputError::MissingQuery),
    };

    if query.chars().count() > max_length {
        return Err(InputError::QueryTooLarge { max: max_length });
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let q = parse_query(br#"{"query":"[out:json];node(1);out;"}"#, 100).unwrap();
        assert_eq!(q, "[out:json];node(1);out;");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_query(b"not json", 100), Err(InputError::InvalidJson));
        assert_eq!(parse_query(b"", 100), Err(InputError::InvalidJson));
        assert_eq!(parse_query(b"{}", 100), Err(InputError::MissingQuery));
        assert_eq!(parse_query(br#"{"query":42}"#, 100), Err(InputError::MissingQuery));
        assert_eq!(parse_query(br#"{"query":""}"#, 100), Err(InputError::MissingQuery));
        assert_eq!(parse_query(br#"["query"]"#, 100), Err(InputError::MissingQuery));
    }

    #[test]
    fn test_length_counts_characters() {
        // Four characters, eight bytes.
        let body = r#"{"query":"äöüß"}"#;
        assert!(parse_query(body.as_bytes(), 4).is_ok());
        assert_eq!(
            parse_query(body.as_bytes(), 3),
            Err(InputError::QueryTooLarge { max: 3 })
        );
    }

    #[test]
    fn test_request_id_generated() {
        let request = Request::builder().body(()).unwrap();
        let id = UuidRequestId.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
