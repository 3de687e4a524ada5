//! Per-entity id allocation

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic id counter. Incremented atomically, never under a partition
/// lock, so inserts into different partitions never serialize here.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    /// Ids start at 1
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}
