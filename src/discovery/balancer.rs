//! Instance selection strategies.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

use crate::config::BalancerKind;

/// Picks one instance out of a non-empty candidate list.
pub trait Balancer: Send + Sync + std::fmt::Debug {
    fn pick<'a>(&self, instances: &'a [String]) -> Option<&'a String>;
}

/// Uniform random selection.
#[derive(Debug, Default)]
pub struct RandomBalancer;

impl Balancer for RandomBalancer {
    fn pick<'a>(&self, instances: &'a [String]) -> Option<&'a String> {
        instances.choose(&mut rand::thread_rng())
    }
}

/// Rotates through instances in order.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl Balancer for RoundRobin {
    fn pick<'a>(&self, instances: &'a [String]) -> Option<&'a String> {
        if instances.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % instances.len();
        instances.get(index)
    }
}

pub fn from_kind(kind: BalancerKind) -> Box<dyn Balancer> {
    match kind {
        BalancerKind::Random => Box::new(RandomBalancer),
        BalancerKind::RoundRobin => Box::new(RoundRobin::default()),
    }
}
