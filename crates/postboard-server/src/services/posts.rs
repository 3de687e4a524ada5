//! Posts

use super::error::{missing_as, require_live, ServiceError, ServiceResult};
use postboard_core::ports::{PostStore, UserStore};
use postboard_core::{NewPost, PageRequest, Post, PostUpdate};
use std::sync::Arc;
use tracing::{debug, info};

pub struct PostService {
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserStore>,
    page_size: usize,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostStore>, users: Arc<dyn UserStore>, page_size: usize) -> Self {
        Self {
            posts,
            users,
            page_size,
        }
    }

    /// Zero-based page of live posts, oldest first
    pub async fn list(&self, page: usize) -> ServiceResult<Vec<Post>> {
        let window = PageRequest::page(page, self.page_size);
        let posts = self.posts.list_posts(window).await?;
        debug!("Listed {} posts on page {}", posts.len(), page);
        Ok(posts)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Post> {
        let lookup = self.posts.get_post(id).await?;
        require_live(lookup, "post", id, ServiceError::PostNotFound)
    }

    pub async fn create(&self, post: NewPost) -> ServiceResult<Post> {
        if !self.users.user_exists(&post.author_id).await? {
            return Err(ServiceError::AuthorNotFound(post.author_id));
        }
        let post = self.posts.insert_post(post).await?;
        info!(
            "Created post: id={}, author={:?}, comments={}",
            post.id, post.author_id, post.allow_comments
        );
        Ok(post)
    }

    pub async fn update(&self, id: &str, update: PostUpdate) -> ServiceResult<Post> {
        let mut post = self.get(id).await?;
        update.apply(&mut post);
        Ok(self.posts.update_post(post).await?)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<Post> {
        let post = self
            .posts
            .delete_post(id)
            .await
            .map_err(|e| missing_as(e, ServiceError::PostNotFound(id.to_string())))?;
        info!("Deleted post: id={}", post.id);
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postboard_core::memory::{MemoryPostStore, MemoryUserStore};
    use postboard_core::NewUser;

    async fn setup(page_size: usize) -> (PostService, String) {
        let users = Arc::new(MemoryUserStore::new(2).unwrap());
        let author = users
            .insert_user(NewUser {
                username: "author".to_string(),
                email: "author@example.com".to_string(),
            })
            .await
            .unwrap();
        let posts = Arc::new(MemoryPostStore::new(4).unwrap());
        (PostService::new(posts, users, page_size), author.id)
    }

    fn new_post(author: &str, title: &str) -> NewPost {
        NewPost {
            author_id: author.to_string(),
            title: title.to_string(),
            body: "body".to_string(),
            allow_comments: true,
        }
    }

    #[tokio::test]
    async fn test_create_requires_author() {
        let (posts, author) = setup(10).await;
        assert!(posts.create(new_post(&author, "ok")).await.is_ok());
        assert_eq!(
            posts.create(new_post("404", "orphan")).await,
            Err(ServiceError::AuthorNotFound("404".to_string()))
        );
    }

    #[tokio::test]
    async fn test_pages() {
        let (posts, author) = setup(4).await;
        for i in 0..10 {
            posts
                .create(new_post(&author, &format!("post {}", i)))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        for page in 0.. {
            let batch = posts.list(page).await.unwrap();
            if batch.is_empty() {
                break;
            }
            assert!(batch.len() <= 4);
            seen.extend(batch.into_iter().map(|p| p.title));
        }
        let expected: Vec<String> = (0..10).map(|i| format!("post {}", i)).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (posts, author) = setup(10).await;
        let post = posts.create(new_post(&author, "draft")).await.unwrap();

        let updated = posts
            .update(
                &post.id,
                PostUpdate {
                    title: Some("final".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "final");
        assert_eq!(updated.body, "body");
        assert_eq!(updated.created_at, post.created_at);

        posts.delete(&post.id).await.unwrap();
        assert_eq!(posts.get(&post.id).await.unwrap_err().code(), "deleted");
        assert!(posts.list(0).await.unwrap().is_empty());
        assert_eq!(
            posts.delete("77").await,
            Err(ServiceError::PostNotFound("77".to_string()))
        );
    }
}
