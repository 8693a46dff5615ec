//! Endpoint selection subsystem.
//!
//! # Data Flow
//! ```text
//! Executor needs the next endpoint
//!     → selector.rs removes endpoints already tried in this request
//!     → keeps the candidates the health registry calls healthy
//!     → Healthy candidates present: strategy picks one
//!         - random.rs (uniform choice, default)
//!         - round_robin.rs (rotate through candidates)
//!     → None healthy: candidate with the oldest failure (least-bad)
//!     → Every endpoint tried: None
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless over the endpoint list; they only see candidates
//! - The least-bad fallback keeps progress possible during a global outage
//! - Algorithm selection is configuration, not code

pub mod random;
pub mod round_robin;
pub mod selector;

use std::fmt::Debug;

use crate::config::SelectionStrategy;
use crate::upstream::endpoint::Endpoint;

pub use random::RandomPick;
pub use round_robin::RoundRobin;
pub use selector::Selector;

/// Chooses one endpoint out of a non-empty set of equally trusted candidates.
pub trait PickStrategy: Send + Sync + Debug {
    /// Returns `None` only when `candidates` is empty.
    fn pick<'a>(&self, candidates: &[&'a Endpoint]) -> Option<&'a Endpoint>;
}

/// Build the strategy named in configuration.
pub fn strategy_for(selection: SelectionStrategy) -> Box<dyn PickStrategy> {
    match selection {
        SelectionStrategy::Random => Box::new(RandomPick::new()),
        SelectionStrategy::RoundRobin => Box::new(RoundRobin::new()),
    }
}
