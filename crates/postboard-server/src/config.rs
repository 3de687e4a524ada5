//! Command line / environment configuration

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::fmt;

/// Storage backend behind the storage ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// Sharded in-memory store, lost on restart
    Memory,
    /// Embedded SQLite database
    Sqlite,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "postboard-server")]
#[command(version, about = "Posts, threaded comments and live comment feeds", long_about = None)]
pub struct Config {
    /// Storage backend
    #[arg(long, env = "POSTBOARD_STORAGE", value_enum, default_value_t = StorageKind::Memory)]
    pub storage: StorageKind,

    /// Number of partitions per in-memory store
    #[arg(long, env = "POSTBOARD_SHARDS_COUNT", default_value_t = 16)]
    pub shards_count: usize,

    /// Page size for listings
    #[arg(long, env = "POSTBOARD_PAGE_SIZE", default_value_t = 20)]
    pub page_size: usize,

    /// Address to listen on
    #[arg(long, env = "POSTBOARD_BIND_ADDRESS", default_value = "0.0.0.0:8080")]
    pub bind_address: String,

    /// SQLite database file (sqlite storage only)
    #[arg(long, env = "POSTBOARD_DATABASE_PATH", default_value = "postboard.db")]
    pub database_path: String,

    /// Queue size of each live comment subscriber, 0 for unbounded
    #[arg(long, env = "POSTBOARD_SUBSCRIBER_BUFFER", default_value_t = 64)]
    pub subscriber_buffer: usize,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "POSTBOARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.shards_count == 0 {
            bail!("shards-count must be at least 1");
        }
        if self.page_size == 0 {
            bail!("page-size must be at least 1");
        }
        Ok(())
    }
}
