//! Upstream call transport.
//!
//! # Responsibilities
//! - Issue one POST of a query to one endpoint
//! - Return status and full body, or a transport error
//! - Refuse bodies larger than the configured cap while streaming them
//!
//! Deadlines are not applied here; the executor races every call against
//! its own timer and drops the future (closing the connection) on expiry.

use axum::body::Bytes;
use axum::http::StatusCode;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::upstream::endpoint::Endpoint;

/// Why a single upstream attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("upstream returned HTTP {}", .0.as_u16())]
    Status(StatusCode),

    #[error("upstream timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("upstream returned invalid JSON: {0}")]
    InvalidBody(String),

    #[error("upstream response exceeded {0} bytes")]
    TooLarge(usize),
}

impl AttemptError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::InvalidBody(_) => "invalid_body",
            Self::TooLarge(_) => "too_large",
        }
    }
}

/// Raw upstream answer, before classification.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Sends a query to an endpoint.
pub trait UpstreamTransport: Send + Sync {
    fn post_query(
        &self,
        endpoint: &Endpoint,
        query: &str,
    ) -> impl Future<Output = Result<UpstreamReply, AttemptError>> + Send;
}

/// HTTP transport backed by a pooled reqwest client.
///
/// Sends `data=<query>` as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    max_body: usize,
}

impl HttpTransport {
    pub fn new(user_agent: &str, max_body: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::from_client(client, max_body))
    }

    pub fn from_client(client: reqwest::Client, max_body: usize) -> Self {
        Self { client, max_body }
    }
}

impl UpstreamTransport for HttpTransport {
    async fn post_query(&self, endpoint: &Endpoint, query: &str) -> Result<UpstreamReply, AttemptError> {
        // URLs are stripped from errors so callers never learn which mirror failed.
        let mut response = self
            .client
            .post(endpoint.url().clone())
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if response.content_length().is_some_and(|len| len > self.max_body as u64) {
            return Err(AttemptError::TooLarge(self.max_body));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AttemptError::Transport(e.without_url().to_string()))?
        {
            if body.len() + chunk.len() > self.max_body {
                return Err(AttemptError::TooLarge(self.max_body));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamReply {
            status,
            body: Bytes::from(body),
        })
    }
}
