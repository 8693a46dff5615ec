//! Upstream endpoint abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream interpreter URL
//! - Expose the host used in diagnostic headers and metric labels
//!
//! Endpoints are immutable configuration; identity is the full URL.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Errors raised while parsing an endpoint from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("endpoint '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("endpoint '{0}' has no host")]
    MissingHost(String),
}

/// A single upstream mirror.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: Url,
    host: Arc<str>,
}

impl Endpoint {
    /// Parse and validate an endpoint URL.
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(raw).map_err(|e| EndpointError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(EndpointError::UnsupportedScheme(raw.to_string()));
        }

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(EndpointError::MissingHost(raw.to_string())),
        };

        Ok(Self {
            url,
            host: host.into(),
        })
    }

    /// Parse an ordered list of endpoints, failing on the first bad entry.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, EndpointError> {
        raw.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    /// Full URL of the interpreter.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host (and explicit port, if any). Never includes path or query.
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}
