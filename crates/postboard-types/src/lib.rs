//! Postboard Types - Pure record definitions
//!
//! Users, posts and comments as plain serializable records, shared by the
//! storage core and the server. No runtime dependencies.

pub mod comment;
pub mod page;
pub mod post;
pub mod user;

pub use comment::*;
pub use page::*;
pub use post::*;
pub use user::*;
