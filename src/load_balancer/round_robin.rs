//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::PickStrategy;
use crate::upstream::endpoint::Endpoint;

/// Round-robin selector.
/// Stores an internal counter to rotate through candidates.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PickStrategy for RoundRobin {
    fn pick<'a>(&self, candidates: &[&'a Endpoint]) -> Option<&'a Endpoint> {
        if candidates.is_empty() {
            return None;
        }

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[index])
    }
}
