//! Uniform random selection strategy.

use rand::seq::SliceRandom;

use crate::load_balancer::PickStrategy;
use crate::upstream::endpoint::Endpoint;

/// Picks uniformly at random, spreading load across mirrors of equal trust.
#[derive(Debug, Default)]
pub struct RandomPick;

impl RandomPick {
    pub fn new() -> Self {
        Self
    }
}

impl PickStrategy for RandomPick {
    fn pick<'a>(&self, candidates: &[&'a Endpoint]) -> Option<&'a Endpoint> {
        candidates.choose(&mut rand::thread_rng()).copied()
    }
}
