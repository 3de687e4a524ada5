//! Partitioned storage
//!
//! A [`ShardRouter`] maps keys onto a fixed number of partitions, a
//! [`ShardedStore`] keeps one independently locked map per partition, and a
//! [`SecondaryIndex`] maps an alternate unique value onto primary keys.
//! Listings live in [`page`].

pub mod index;
pub mod page;
pub mod router;
pub mod store;

pub use index::{IndexEntry, IndexSlot, SecondaryIndex};
pub use router::ShardRouter;
pub use store::ShardedStore;
