//! FIFO work list of regions waiting to be searched.

use std::collections::VecDeque;

use mapsweep_shared::SearchRegion;

/// Regions pending a search, processed breadth-first.
#[derive(Debug, Default)]
pub struct RegionQueue {
    pending: VecDeque<SearchRegion>,
    total_enqueued: usize,
}

impl RegionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, region: SearchRegion) {
        self.total_enqueued += 1;
        self.pending.push_back(region);
    }

    pub fn extend(&mut self, regions: impl IntoIterator<Item = SearchRegion>) {
        for region in regions {
            self.push(region);
        }
    }

    /// Take up to `max` regions from the front of the queue.
    pub fn drain_batch(&mut self, max: usize) -> Vec<SearchRegion> {
        let count = self.pending.len().min(max);
        self.pending.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Regions ever pushed, including those already consumed.
    pub fn total_enqueued(&self) -> usize {
        self.total_enqueued
    }
}
