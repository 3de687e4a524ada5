//! Storage traits, one per entity type.
//!
//! Implemented by the in-memory sharded backend and by the SQLite backend;
//! both follow the same contract: ids and creation times are assigned on
//! insert, deletion is soft, listings hold live records only, ordered by
//! creation time then id. Updates never touch the id, creation time,
//! author or thread placement of a record.

use crate::record::Lookup;
use crate::Result;
use async_trait::async_trait;
use postboard_types::{Comment, NewComment, NewPost, NewUser, PageRequest, Post, User};

/// User store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Lookup<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Lookup<User>>;
    async fn user_exists(&self, id: &str) -> Result<bool>;
    /// Fails with `AlreadyExists` if a live user holds the username
    async fn insert_user(&self, user: NewUser) -> Result<User>;
    /// Usernames are immutable; changing one fails with `Conflict`
    async fn update_user(&self, user: User) -> Result<User>;
    async fn delete_user(&self, id: &str) -> Result<User>;
}

/// Post store
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_post(&self, id: &str) -> Result<Lookup<Post>>;
    async fn post_exists(&self, id: &str) -> Result<bool>;
    async fn insert_post(&self, post: NewPost) -> Result<Post>;
    /// Title, body and comment policy change; the author is fixed
    async fn update_post(&self, post: Post) -> Result<Post>;
    async fn delete_post(&self, id: &str) -> Result<Post>;
    async fn list_posts(&self, page: PageRequest) -> Result<Vec<Post>>;
}

/// Comment store
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn get_comment(&self, id: &str) -> Result<Lookup<Comment>>;
    async fn comment_exists(&self, id: &str) -> Result<bool>;
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;
    /// Only the body changes; author and thread placement are fixed
    async fn update_comment(&self, comment: Comment) -> Result<Comment>;
    async fn delete_comment(&self, id: &str) -> Result<Comment>;
    async fn list_comments(&self, filter: CommentFilter, page: PageRequest)
        -> Result<Vec<Comment>>;
}

/// Which comments a listing returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentFilter {
    /// Comments directly under a post (no parent comment)
    TopLevel { post_id: String },
    /// Replies to a comment
    Replies { comment_id: String },
}

impl CommentFilter {
    pub fn top_level(post_id: impl Into<String>) -> Self {
        CommentFilter::TopLevel {
            post_id: post_id.into(),
        }
    }

    pub fn replies(comment_id: impl Into<String>) -> Self {
        CommentFilter::Replies {
            comment_id: comment_id.into(),
        }
    }

    pub fn matches(&self, comment: &Comment) -> bool {
        match self {
            CommentFilter::TopLevel { post_id } => {
                comment.parent_post_id == *post_id && comment.is_top_level()
            }
            CommentFilter::Replies { comment_id } => {
                comment.parent_comment_id.as_deref() == Some(comment_id.as_str())
            }
        }
    }
}
