//! Two-tier endpoint selection.
//!
//! Prefer a healthy endpoint chosen by the configured strategy; when every
//! untried endpoint failed recently, fall back to the one whose failure is
//! oldest so a request still gets somewhere during a global outage.

use std::collections::HashSet;
use std::time::Instant;

use crate::health::HealthRegistry;
use crate::load_balancer::PickStrategy;
use crate::upstream::endpoint::Endpoint;

/// Endpoints already attempted within one client request.
pub type AttemptSet = HashSet<Endpoint>;

#[derive(Debug)]
pub struct Selector {
    strategy: Box<dyn PickStrategy>,
}

impl Selector {
    pub fn new(strategy: Box<dyn PickStrategy>) -> Self {
        Self { strategy }
    }

    /// Choose the next endpoint to try, or `None` once every endpoint is in `tried`.
    pub fn select<'a>(
        &self,
        endpoints: &'a [Endpoint],
        registry: &dyn HealthRegistry,
        tried: &AttemptSet,
        now: Instant,
    ) -> Option<&'a Endpoint> {
        let candidates: Vec<&Endpoint> = endpoints.iter().filter(|e| !tried.contains(*e)).collect();
        if candidates.is_empty() {
            return None;
        }

        let healthy: Vec<&Endpoint> = candidates
            .iter()
            .copied()
            .filter(|e| registry.is_healthy(e, now))
            .collect();
        if !healthy.is_empty() {
            return self.strategy.pick(&healthy);
        }

        // Ties keep configuration order.
        let fallback = candidates
            .into_iter()
            .min_by_key(|e| registry.last_failure(e));
        if let Some(endpoint) = fallback {
            tracing::debug!(endpoint = %endpoint, "All candidates recently failed, using least recently failed");
        }
        fallback
    }
}
