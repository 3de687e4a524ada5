//! Postboard Core Library
//!
//! Partitioned in-memory record store, secondary unique index, paginated
//! listings and the topic-keyed subscription bus that backs live comment
//! feeds. The storage and subscription ports live in [`ports`]; the
//! in-memory implementations of the storage port live in [`memory`].

// Re-export pure types from postboard-types
pub use postboard_types::*;

pub mod bus;
pub mod error;
pub mod ids;
pub mod memory;
pub mod ports;
pub mod record;
pub mod shard;

pub use bus::{EndpointId, Subscription, SubscriptionBus};
pub use error::{Result, StoreError};
pub use ids::IdSequence;
pub use record::{Lookup, Record};
pub use shard::{SecondaryIndex, ShardRouter, ShardedStore};
