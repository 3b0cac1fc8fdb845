//! Bounding the number of links that get published per run.

use rand::Rng;

use crate::ingest::types::{ProxyBatch, ProxyLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    /// Publish at most this many links; `None` publishes everything.
    pub ceiling: Option<usize>,
}

impl SamplingPolicy {
    pub fn unbounded() -> Self {
        Self { ceiling: None }
    }

    pub fn capped(ceiling: usize) -> Self {
        Self {
            ceiling: Some(ceiling),
        }
    }

    /// Uniform random subset of size `ceiling` when the batch is larger,
    /// otherwise the whole batch. Selected links keep their batch order.
    pub fn sample<R: Rng + ?Sized>(&self, batch: &ProxyBatch, rng: &mut R) -> Vec<ProxyLink> {
        let links = batch.links();
        match self.ceiling {
            Some(cap) if links.len() > cap => {
                let mut picked = rand::seq::index::sample(rng, links.len(), cap).into_vec();
                picked.sort_unstable();
                picked.into_iter().map(|i| links[i].clone()).collect()
            }
            _ => links.to_vec(),
        }
    }
}
