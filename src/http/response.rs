//! Response shaping.
//!
//! # Responsibilities
//! - Pass successful upstream JSON through unchanged, with edge-cache headers
//! - Map every failure class to its status code and JSON error body
//!
//! # Design Decisions
//! - Callers never learn which endpoints were tried or why each failed
//! - `X-Upstream-Endpoint` carries the host only, never path or query

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::CacheConfig;
use crate::http::request::InputError;
use crate::query::QueryRejection;
use crate::upstream::{AttemptError, Endpoint, UpstreamOutcome};

pub const X_UPSTREAM_ENDPOINT: &str = "x-upstream-endpoint";

const DEFAULT_UNAVAILABLE_MESSAGE: &str = "All upstream endpoints failed";

/// Turn an executor outcome into the client response.
pub fn shape(outcome: UpstreamOutcome, cache: &CacheConfig) -> Response {
    match outcome {
        UpstreamOutcome::Succeeded { endpoint, body, .. } => success(&endpoint, body, cache),
        UpstreamOutcome::Exhausted { last_error, .. } => unavailable(last_error.as_ref(), cache),
    }
}

/// 200 with the upstream body verbatim.
pub fn success(endpoint: &Endpoint, body: Bytes, cache: &CacheConfig) -> Response {
    let cache_control = format!(
        "s-maxage={}, stale-while-revalidate={}",
        cache.s_maxage_secs, cache.stale_while_revalidate_secs
    );

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CACHE_CONTROL, cache_control);
    if let Ok(host) = HeaderValue::from_str(endpoint.host()) {
        builder = builder.header(X_UPSTREAM_ENDPOINT, host);
    }

    builder
        .body(Body::from(body))
        .unwrap_or_else(|e| internal_error(&e.to_string()))
}

/// 503 once every attempt failed.
pub fn unavailable(last_error: Option<&AttemptError>, cache: &CacheConfig) -> Response {
    let message = last_error
        .map(ToString::to_string)
        .unwrap_or_else(|| DEFAULT_UNAVAILABLE_MESSAGE.to_string());

    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::RETRY_AFTER, cache.retry_after_secs.to_string())],
        Json(json!({ "error": "Upstream unavailable", "message": message })),
    )
        .into_response()
}

/// 400 carrying the validator's reason.
pub fn rejected(rejection: &QueryRejection) -> Response {
    error(StatusCode::BAD_REQUEST, &rejection.to_string())
}

/// 400 for malformed input.
pub fn invalid_input(err: &InputError) -> Response {
    match err {
        InputError::QueryTooLarge { max } => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string(), "maxSize": max })),
        )
            .into_response(),
        _ => error(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

/// 405 for anything but POST.
pub fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn internal_error(detail: &str) -> Response {
    tracing::error!(detail = %detail, "Failed to build response");
    error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
