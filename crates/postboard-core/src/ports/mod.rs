//! Port traits (interfaces) consumed by the service layer

pub mod storage;
pub mod subscription;

pub use storage::{CommentFilter, CommentStore, PostStore, UserStore};
pub use subscription::CommentFeed;
