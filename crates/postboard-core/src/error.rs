//! Error types for the storage core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Already deleted: {0}")]
    AlreadyDeleted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &str, key: &str) -> Self {
        StoreError::NotFound(format!("{} {}", kind, key))
    }

    pub fn already_exists(kind: &str, key: &str) -> Self {
        StoreError::AlreadyExists(format!("{} {}", kind, key))
    }

    pub fn already_deleted(kind: &str, key: &str) -> Self {
        StoreError::AlreadyDeleted(format!("{} {}", kind, key))
    }
}
