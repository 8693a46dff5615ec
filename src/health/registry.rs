//! Endpoint failure registry.
//!
//! # Responsibilities
//! - Remember when each endpoint last failed
//! - Answer "recently failed?" against a window that config reloads can change
//! - Forget an endpoint's failure as soon as it serves a success
//!
//! # Design Decisions
//! - Absence of a record means healthy
//! - Records age out implicitly; nothing sweeps the map
//! - Last write wins; no cross-operation atomicity is needed

use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::upstream::endpoint::Endpoint;

/// Shared record of recent upstream failures.
///
/// Implementations must tolerate concurrent calls from many in-flight requests.
pub trait HealthRegistry: Send + Sync + Debug {
    /// Record a failure observed at `at`. Replaces any earlier record.
    fn mark_failed_at(&self, endpoint: &Endpoint, at: Instant);

    /// Remove any failure record for `endpoint`.
    fn mark_healthy(&self, endpoint: &Endpoint);

    /// Time of the last recorded failure, if any.
    fn last_failure(&self, endpoint: &Endpoint) -> Option<Instant>;

    /// True when there is no record, or the record is older than the window.
    fn is_healthy(&self, endpoint: &Endpoint, now: Instant) -> bool;

    /// Replace the failure window. Existing records are judged against the new one.
    fn set_window(&self, window: Duration);

    /// Record a failure observed now.
    fn mark_failed(&self, endpoint: &Endpoint) {
        self.mark_failed_at(endpoint, Instant::now());
    }
}

/// Process-local registry backed by a concurrent map.
#[derive(Debug)]
pub struct InMemoryHealthRegistry {
    failures: DashMap<Endpoint, Instant>,
    window_ms: AtomicU64,
}

impl InMemoryHealthRegistry {
    pub fn new(window: Duration) -> Self {
        Self {
            failures: DashMap::new(),
            window_ms: AtomicU64::new(window.as_millis() as u64),
        }
    }

    /// Failure window this registry applies.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms.load(Ordering::Relaxed))
    }

    /// Number of endpoints with a failure record (expired or not).
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl HealthRegistry for InMemoryHealthRegistry {
    fn mark_failed_at(&self, endpoint: &Endpoint, at: Instant) {
        self.failures.insert(endpoint.clone(), at);
        metrics::record_endpoint_health(endpoint.host(), false);
    }

    fn mark_healthy(&self, endpoint: &Endpoint) {
        if self.failures.remove(endpoint).is_some() {
            tracing::info!(endpoint = %endpoint, "Endpoint recovered");
        }
        metrics::record_endpoint_health(endpoint.host(), true);
    }

    fn last_failure(&self, endpoint: &Endpoint) -> Option<Instant> {
        self.failures.get(endpoint).map(|r| *r.value())
    }

    fn is_healthy(&self, endpoint: &Endpoint, now: Instant) -> bool {
        match self.last_failure(endpoint) {
            None => true,
            Some(failed_at) => now.saturating_duration_since(failed_at) > self.window(),
        }
    }

    fn set_window(&self, window: Duration) {
        let previous = self.window_ms.swap(window.as_millis() as u64, Ordering::Relaxed);
        if previous != window.as_millis() as u64 {
            tracing::info!(window_secs = window.as_secs(), "Health window changed");
        }
    }
}
