//! Secondary unique index over a sharded store

use crate::error::{Result, StoreError};
use crate::record::{Lookup, Record};
use crate::shard::store::{ShardedStore, SlotGuard};
use chrono::{DateTime, Utc};

/// Maps a unique value (e.g. a username) to the primary key holding it.
/// A retired entry keeps its target so lookups can report the record as
/// deleted, but no longer reserves the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub value: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl IndexEntry {
    fn pointing_at(target: &str) -> Self {
        Self {
            value: String::new(),
            target: target.to_string(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

impl Record for IndexEntry {
    fn key(&self) -> &str {
        &self.value
    }

    fn assign(&mut self, id: String, created_at: DateTime<Utc>) {
        self.value = id;
        self.created_at = created_at;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn set_deleted_at(&mut self, at: Option<DateTime<Utc>>) {
        self.deleted_at = at;
    }
}

/// Unique value -> primary key.
///
/// Lock order: a caller that touches both the index and the primary store
/// takes the index slot first (via [`SecondaryIndex::lock`]) and holds it
/// across the primary mutation. Check, primary insert and index write
/// therefore form one critical section per unique value.
pub struct SecondaryIndex {
    entries: ShardedStore<IndexEntry>,
}

impl SecondaryIndex {
    pub fn new(kind: &'static str, shard_count: usize) -> Result<Self> {
        Ok(Self {
            entries: ShardedStore::new(kind, shard_count)?,
        })
    }

    /// Primary key registered for `value`
    pub async fn get(&self, value: &str) -> Lookup<String> {
        self.entries.get(value).await.map(|entry| entry.target)
    }

    pub async fn lock(&self, value: &str) -> IndexSlot<'_> {
        IndexSlot {
            slot: self.entries.lock_slot(value).await,
        }
    }
}

/// A locked index partition for one unique value
pub struct IndexSlot<'a> {
    slot: SlotGuard<'a, IndexEntry>,
}

impl<'a> IndexSlot<'a> {
    pub fn value(&self) -> &str {
        self.slot.key()
    }

    /// Fail with `AlreadyExists` while a live entry holds the value
    pub fn ensure_vacant(&self) -> Result<()> {
        match self.slot.get() {
            Lookup::Found(_) => Err(self.taken()),
            _ => Ok(()),
        }
    }

    /// Point the value at `target`
    pub fn bind(mut self, target: &str) -> Result<()> {
        self.slot.put(IndexEntry::pointing_at(target)).map(|_| ())
    }

    /// Release the value if it still points at `target`
    pub fn retire(mut self, target: &str) -> Result<()> {
        match self.slot.get() {
            Lookup::Found(entry) if entry.target == target => self.slot.soft_delete().map(|_| ()),
            Lookup::Found(_) => Err(StoreError::Conflict(format!(
                "{} is bound to another record",
                self.value()
            ))),
            _ => Ok(()),
        }
    }

    fn taken(&self) -> StoreError {
        StoreError::AlreadyExists(format!("{} is taken", self.value()))
    }
}
