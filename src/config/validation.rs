//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check endpoint URLs parse and are unique
//! - Validate value ranges (timeouts > 0, limits > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::upstream::endpoint::{Endpoint, EndpointError};

/// Headroom between the last attempt deadline and the whole-request ceiling.
pub const REQUEST_CEILING_SLACK_MS: u64 = 1_000;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.endpoints must not be empty")]
    NoEndpoints,

    #[error("upstream.endpoints: {0}")]
    BadEndpoint(EndpointError),

    #[error("upstream.endpoints: duplicate endpoint '{0}'")]
    DuplicateEndpoint(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("listener.path must start with '/', got '{0}'")]
    BadPath(String),

    #[error("timeouts.request_secs ({request_secs}s) must exceed {max_attempts} attempts of {attempt_ms}ms plus {slack_ms}ms")]
    RequestCeilingTooShort {
        request_secs: u64,
        attempt_ms: u64,
        max_attempts: u32,
        slack_ms: u64,
    },
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let upstream = &config.upstream;

    if upstream.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }

    let mut seen = HashSet::new();
    for raw in &upstream.endpoints {
        match Endpoint::parse(raw) {
            Ok(endpoint) => {
                if !seen.insert(endpoint) {
                    errors.push(ValidationError::DuplicateEndpoint(raw.clone()));
                }
            }
            Err(e) => errors.push(ValidationError::BadEndpoint(e)),
        }
    }

    let positive: [(&'static str, u64); 8] = [
        ("upstream.attempt_timeout_ms", upstream.attempt_timeout_ms),
        ("upstream.max_attempts", upstream.max_attempts as u64),
        ("upstream.health_window_secs", upstream.health_window_secs),
        ("upstream.max_response_bytes", upstream.max_response_bytes as u64),
        ("query.max_length", config.query.max_length as u64),
        ("query.max_statements", config.query.max_statements as u64),
        ("query.max_around_radius_m", config.query.max_around_radius_m),
        ("security.max_body_size", config.security.max_body_size as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_second == 0 {
            errors.push(ValidationError::Zero { field: "rate_limit.requests_per_second" });
        }
        if config.rate_limit.burst_size == 0 {
            errors.push(ValidationError::Zero { field: "rate_limit.burst_size" });
        }
    }

    if !config.listener.path.starts_with('/') {
        errors.push(ValidationError::BadPath(config.listener.path.clone()));
    }

    // The ceiling must never cut the failover loop short, or the client
    // sees a bare timeout instead of the shaped 503.
    let worst_case_ms = upstream
        .attempt_timeout_ms
        .saturating_mul(upstream.max_attempts as u64)
        .saturating_add(REQUEST_CEILING_SLACK_MS);
    if config.timeouts.request_secs.saturating_mul(1000) < worst_case_ms {
        errors.push(ValidationError::RequestCeilingTooShort {
            request_secs: config.timeouts.request_secs,
            attempt_ms: upstream.attempt_timeout_ms,
            max_attempts: upstream.max_attempts,
            slack_ms: REQUEST_CEILING_SLACK_MS,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
