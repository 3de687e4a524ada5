//! Generic partitioned keyed store with soft-delete semantics

use crate::error::{Result, StoreError};
use crate::record::{Lookup, Record};
use crate::shard::router::ShardRouter;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::error;

type Shard<T> = Arc<RwLock<HashMap<String, T>>>;

/// Fixed array of independently locked maps.
///
/// Every operation on a key takes only the lock of the partition the key
/// routes to. Records are never removed; deletion stamps `deleted_at`.
pub struct ShardedStore<T> {
    kind: &'static str,
    router: ShardRouter,
    shards: Vec<Shard<T>>,
}

impl<T: Record> ShardedStore<T> {
    /// `kind` names the stored entity in error messages ("user", "post", ...)
    pub fn new(kind: &'static str, shard_count: usize) -> Result<Self> {
        let router = ShardRouter::new(shard_count)?;
        let shards = (0..shard_count)
            .map(|_| Arc::new(RwLock::new(HashMap::new())))
            .collect();

        Ok(Self {
            kind,
            router,
            shards,
        })
    }

    fn shard(&self, key: &str) -> &Shard<T> {
        &self.shards[self.router.route(key)]
    }

    pub async fn get(&self, key: &str) -> Lookup<T> {
        let shard = self.shard(key).read().await;
        Lookup::from_stored(shard.get(key).cloned())
    }

    pub async fn contains_live(&self, key: &str) -> bool {
        let shard = self.shard(key).read().await;
        shard.get(key).map(Record::is_live).unwrap_or(false)
    }

    /// Store a new record under `key`, stamping id and creation time.
    pub async fn insert(&self, key: &str, mut record: T) -> Result<T> {
        let mut shard = self.shard(key).write().await;
        if shard.contains_key(key) {
            return Err(StoreError::already_exists(self.kind, key));
        }

        record.assign(key.to_string(), Utc::now());
        record.set_deleted_at(None);
        shard.insert(key.to_string(), record.clone());
        Ok(record)
    }

    /// Edit a live record in place under its partition lock. Id, creation
    /// time and delete stamp stay as stored whatever `edit` does; if `edit`
    /// fails nothing is written.
    pub async fn update<F>(&self, key: &str, edit: F) -> Result<T>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let mut shard = self.shard(key).write().await;
        let mut record = match shard.get(key) {
            None => return Err(StoreError::not_found(self.kind, key)),
            Some(existing) if !existing.is_live() => {
                return Err(StoreError::already_deleted(self.kind, key))
            }
            Some(existing) => existing.clone(),
        };

        let created_at = record.created_at();
        edit(&mut record)?;
        record.assign(key.to_string(), created_at);
        record.set_deleted_at(None);
        shard.insert(key.to_string(), record.clone());
        Ok(record)
    }

    pub async fn soft_delete(&self, key: &str) -> Result<T> {
        let mut shard = self.shard(key).write().await;
        let record = shard
            .get_mut(key)
            .ok_or_else(|| StoreError::not_found(self.kind, key))?;
        if !record.is_live() {
            return Err(StoreError::already_deleted(self.kind, key));
        }

        record.set_deleted_at(Some(Utc::now()));
        Ok(record.clone())
    }

    /// Filter every partition in parallel, one task per partition, and
    /// wait for all of them. Each partition is read under its own lock;
    /// there is no snapshot across partitions.
    pub async fn scan_all<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        let tasks = self.shards.iter().map(|shard| {
            let shard = shard.clone();
            let predicate = predicate.clone();
            tokio::spawn(async move {
                let data = shard.read().await;
                data.values()
                    .filter(|record| predicate(record))
                    .cloned()
                    .collect::<Vec<T>>()
            })
        });

        let mut rows = Vec::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok(part) => rows.extend(part),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => error!("{} scan task cancelled: {}", self.kind, e),
            }
        }
        rows
    }

    /// Write-lock the partition `key` routes to and keep it locked until
    /// the guard is dropped.
    pub(crate) async fn lock_slot(&self, key: &str) -> SlotGuard<'_, T> {
        SlotGuard {
            kind: self.kind,
            key: key.to_string(),
            map: self.shard(key).write().await,
        }
    }

    /// Stored records, soft-deleted ones included
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.read().await.len();
        }
        total
    }
}

/// Exclusive access to one key's partition, for the secondary index.
///
/// `put` overwrites a soft-deleted record, which is how a retired unique
/// value gets rebound. Primary stores go through `insert` and `update`,
/// which never bring a deleted record back.
pub(crate) struct SlotGuard<'a, T> {
    kind: &'static str,
    key: String,
    map: RwLockWriteGuard<'a, HashMap<String, T>>,
}

impl<'a, T: Record> SlotGuard<'a, T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Lookup<T> {
        Lookup::from_stored(self.map.get(&self.key).cloned())
    }

    /// Store `record` under the slot key. A soft-deleted record in the slot
    /// is overwritten; a live one is not.
    pub fn put(&mut self, mut record: T) -> Result<T> {
        if self.map.get(&self.key).map(Record::is_live).unwrap_or(false) {
            return Err(StoreError::already_exists(self.kind, &self.key));
        }

        record.assign(self.key.clone(), Utc::now());
        record.set_deleted_at(None);
        self.map.insert(self.key.clone(), record.clone());
        Ok(record)
    }

    pub fn soft_delete(&mut self) -> Result<T> {
        let record = self
            .map
            .get_mut(&self.key)
            .ok_or_else(|| StoreError::not_found(self.kind, &self.key))?;
        if !record.is_live() {
            return Err(StoreError::already_deleted(self.kind, &self.key));
        }

        record.set_deleted_at(Some(Utc::now()));
        Ok(record.clone())
    }
}
