//! Key to partition routing

use crate::error::{Result, StoreError};
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

/// Deterministic key -> partition mapping.
///
/// The hash is salted with a `RandomState` drawn when the router is built,
/// so the same key always lands on the same partition for the lifetime of
/// the process while the layout differs between process starts.
#[derive(Clone, Debug)]
pub struct ShardRouter {
    salt: RandomState,
    shard_count: usize,
}

impl ShardRouter {
    pub fn new(shard_count: usize) -> Result<Self> {
        if shard_count == 0 {
            return Err(StoreError::InvalidConfiguration(
                "shard count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            salt: RandomState::new(),
            shard_count,
        })
    }

    /// Partition index in `[0, shard_count)`
    pub fn route(&self, key: &str) -> usize {
        (self.salt.hash_one(key) % self.shard_count as u64) as usize
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }
}
