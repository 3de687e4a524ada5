//! Storage layer
//!
//! Either the sharded in-memory stores from `postboard-core` or the embedded
//! SQLite database, picked by configuration. Both sit behind the same ports.

pub mod db;

pub use db::Database;

use crate::config::{Config, StorageKind};
use anyhow::{Context, Result};
use postboard_core::memory::{MemoryCommentStore, MemoryPostStore, MemoryUserStore};
use postboard_core::ports::{CommentStore, PostStore, UserStore};
use std::sync::Arc;
use tracing::info;

/// The three entity stores handed to the services
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
}

impl Stores {
    pub fn in_memory(shard_count: usize) -> Result<Self> {
        Ok(Self {
            users: Arc::new(MemoryUserStore::new(shard_count)?),
            posts: Arc::new(MemoryPostStore::new(shard_count)?),
            comments: Arc::new(MemoryCommentStore::new(shard_count)?),
        })
    }

    pub fn from_database(db: Arc<Database>) -> Self {
        Self {
            users: db.clone(),
            posts: db.clone(),
            comments: db,
        }
    }

    pub async fn open(config: &Config) -> Result<Self> {
        match config.storage {
            StorageKind::Memory => {
                info!(
                    "Using in-memory storage with {} shards",
                    config.shards_count
                );
                Self::in_memory(config.shards_count).context("Failed to build in-memory storage")
            }
            StorageKind::Sqlite => {
                info!("Using SQLite storage at {}", config.database_path);
                let db = Database::new(&config.database_path)
                    .await
                    .context("Failed to initialize database")?;
                Ok(Self::from_database(Arc::new(db)))
            }
        }
    }
}
