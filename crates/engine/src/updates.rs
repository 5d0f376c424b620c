//! Pending block updates.
//!
//! Any edit schedules the edited cell and its six neighbours. The owner drains
//! the whole batch once per tick; cells scheduled while a batch is being
//! processed land in the next batch, so effects propagate one cell per tick.

use indexmap::IndexSet;

use crate::world::position::{BlockPos, Dimensions};

/// Insertion-ordered, deduplicated set of in-bounds cells awaiting re-evaluation.
pub struct UpdateQueue {
    dims: Dimensions,
    pending: IndexSet<BlockPos>,
}

impl UpdateQueue {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            pending: IndexSet::new(),
        }
    }

    /// Schedule one cell. Out-of-bounds positions are ignored.
    pub fn schedule(&mut self, pos: BlockPos) {
        if self.dims.contains(pos) {
            self.pending.insert(pos);
        }
    }

    /// Schedule a cell and its six face neighbours.
    pub fn schedule_around(&mut self, pos: BlockPos) {
        self.schedule(pos);
        for n in pos.neighbors() {
            self.schedule(n);
        }
    }

    /// Take the current batch, leaving the queue empty.
    pub fn take(&mut self) -> Vec<BlockPos> {
        let batch: Vec<BlockPos> = self.pending.drain(..).collect();
        if !batch.is_empty() {
            tracing::trace!("draining {} pending block updates", batch.len());
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.pending.contains(&pos)
    }
}
