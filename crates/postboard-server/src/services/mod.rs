//! Business logic services

pub mod comments;
pub mod error;
pub mod posts;
pub mod users;

pub use comments::CommentService;
pub use error::ServiceError;
pub use posts::PostService;
pub use users::UserService;
