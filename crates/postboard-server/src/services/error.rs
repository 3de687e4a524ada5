//! Service-level errors
//!
//! Domain checks (missing author, closed comments, cross-post replies) are
//! kept apart from the storage errors they sit on top of.

use postboard_core::{Lookup, StoreError};
use thiserror::Error;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Author not found: {0}")]
    AuthorNotFound(String),

    #[error("Post not found: {0}")]
    PostNotFound(String),

    #[error("Comment not found: {0}")]
    CommentNotFound(String),

    #[error("Comments are disabled on post {0}")]
    CommentsDisabled(String),

    #[error("Comment {comment} does not belong to post {post}")]
    ParentMismatch { comment: String, post: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::UserNotFound(_) => "user_not_found",
            ServiceError::AuthorNotFound(_) => "author_not_found",
            ServiceError::PostNotFound(_) => "post_not_found",
            ServiceError::CommentNotFound(_) => "comment_not_found",
            ServiceError::CommentsDisabled(_) => "comments_disabled",
            ServiceError::ParentMismatch { .. } => "parent_mismatch",
            ServiceError::Store(StoreError::NotFound(_)) => "not_found",
            ServiceError::Store(StoreError::AlreadyExists(_)) => "already_exists",
            ServiceError::Store(StoreError::AlreadyDeleted(_)) => "deleted",
            ServiceError::Store(StoreError::Conflict(_)) => "conflict",
            ServiceError::Store(StoreError::InvalidConfiguration(_))
            | ServiceError::Store(StoreError::Backend(_)) => "internal",
        }
    }
}

/// Unwrap a live record. Deleted records are reported as such, missing ones
/// through `missing`.
pub(crate) fn require_live<T>(
    lookup: Lookup<T>,
    kind: &str,
    id: &str,
    missing: impl FnOnce(String) -> ServiceError,
) -> ServiceResult<T> {
    match lookup {
        Lookup::Found(record) => Ok(record),
        Lookup::Deleted(_) => Err(StoreError::already_deleted(kind, id).into()),
        Lookup::NotFound => Err(missing(id.to_string())),
    }
}

/// Report a store-level `NotFound` as the given domain error
pub(crate) fn missing_as(err: StoreError, missing: ServiceError) -> ServiceError {
    match err {
        StoreError::NotFound(_) => missing,
        other => other.into(),
    }
}
