//! Bounded retry and failover loop.
//!
//! # State Machine
//! ```text
//! Attempting(n), n = 1..=max_attempts
//!     select endpoint (untried, health-aware)
//!         → None                 → Exhausted
//!     POST under deadline
//!         → 2xx + valid JSON     → mark_healthy → Succeeded
//!         → non-2xx / timeout / transport / bad JSON
//!                                → mark_failed → Attempting(n + 1) or Exhausted
//! ```
//!
//! Attempts are strictly sequential. Each one targets a distinct endpoint.

use axum::body::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use crate::config::UpstreamConfig;
use crate::health::HealthRegistry;
use crate::load_balancer::selector::{AttemptSet, Selector};
use crate::load_balancer::strategy_for;
use crate::observability::metrics;
use crate::upstream::endpoint::{Endpoint, EndpointError};
use crate::upstream::transport::{AttemptError, UpstreamReply, UpstreamTransport};

/// Terminal result of executing one client query.
#[derive(Debug)]
pub enum UpstreamOutcome {
    /// An endpoint answered 2xx with a well-formed JSON body.
    Succeeded {
        endpoint: Endpoint,
        /// Upstream body, byte-for-byte.
        body: Bytes,
        attempts: u32,
    },
    /// Every allowed attempt failed, or no endpoint was left to try.
    Exhausted {
        last_error: Option<AttemptError>,
        attempts: u32,
    },
}

impl UpstreamOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Drives selection, upstream calls, and health bookkeeping for one query.
#[derive(Debug)]
pub struct Executor<T> {
    endpoints: Vec<Endpoint>,
    registry: Arc<dyn HealthRegistry>,
    selector: Selector,
    transport: T,
    attempt_timeout: Duration,
    max_attempts: u32,
}

impl<T: UpstreamTransport> Executor<T> {
    pub fn new(
        endpoints: Vec<Endpoint>,
        registry: Arc<dyn HealthRegistry>,
        selector: Selector,
        transport: T,
        attempt_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            endpoints,
            registry,
            selector,
            transport,
            attempt_timeout,
            max_attempts,
        }
    }

    /// Build an executor from upstream configuration.
    pub fn from_config(
        config: &UpstreamConfig,
        registry: Arc<dyn HealthRegistry>,
        transport: T,
    ) -> Result<Self, EndpointError> {
        let endpoints = Endpoint::parse_all(&config.endpoints)?;
        Ok(Self::new(
            endpoints,
            registry,
            Selector::new(strategy_for(config.selection)),
            transport,
            config.attempt_timeout(),
            config.max_attempts,
        ))
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn registry(&self) -> &Arc<dyn HealthRegistry> {
        &self.registry
    }

    /// Run the failover loop for `query`.
    pub async fn execute(&self, query: &str) -> UpstreamOutcome {
        let mut tried = AttemptSet::new();
        let mut last_error = None;
        let mut attempts = 0;

        while attempts < self.max_attempts {
            let Some(endpoint) =
                self.selector
                    .select(&self.endpoints, self.registry.as_ref(), &tried, Instant::now())
            else {
                break;
            };
            tried.insert(endpoint.clone());
            attempts += 1;

            let started = Instant::now();
            match self.attempt(endpoint, query).await {
                Ok(body) => {
                    self.registry.mark_healthy(endpoint);
                    metrics::record_attempt(endpoint.host(), "success", started);
                    tracing::debug!(
                        endpoint = %endpoint,
                        attempt = attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Upstream attempt succeeded"
                    );
                    return UpstreamOutcome::Succeeded {
                        endpoint: endpoint.clone(),
                        body,
                        attempts,
                    };
                }
                Err(error) => {
                    self.registry.mark_failed(endpoint);
                    metrics::record_attempt(endpoint.host(), error.kind(), started);
                    tracing::warn!(
                        endpoint = %endpoint,
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        error = %error,
                        "Upstream attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        tracing::error!(attempts, "All upstream attempts failed");
        UpstreamOutcome::Exhausted { last_error, attempts }
    }

    /// One deadline-bound call, classified into a usable body or an error.
    async fn attempt(&self, endpoint: &Endpoint, query: &str) -> Result<Bytes, AttemptError> {
        let reply = time::timeout(self.attempt_timeout, self.transport.post_query(endpoint, query))
            .await
            .map_err(|_| AttemptError::Timeout(self.attempt_timeout))??;

        classify(reply)
    }
}

fn classify(reply: UpstreamReply) -> Result<Bytes, AttemptError> {
    if !reply.status.is_success() {
        return Err(AttemptError::Status(reply.status));
    }

    // Checked, not kept: the body is forwarded untouched.
    serde_json::from_slice::<serde::de::IgnoredAny>(&reply.body)
        .map_err(|e| AttemptError::InvalidBody(e.to_string()))?;

    Ok(reply.body)
}
