//! In-memory storage backend
//!
//! Implements the storage ports over [`ShardedStore`](crate::ShardedStore).
//! Nothing survives a restart.

pub mod comments;
pub mod posts;
pub mod users;

pub use comments::MemoryCommentStore;
pub use posts::MemoryPostStore;
pub use users::MemoryUserStore;

use crate::error::{Result, StoreError};
use crate::record::Lookup;

/// Turn a lookup into the live record or the matching error
pub(crate) fn require_live<T>(lookup: Lookup<T>, kind: &str, key: &str) -> Result<T> {
    match lookup {
        Lookup::Found(record) => Ok(record),
        Lookup::Deleted(_) => Err(StoreError::already_deleted(kind, key)),
        Lookup::NotFound => Err(StoreError::not_found(kind, key)),
    }
}
