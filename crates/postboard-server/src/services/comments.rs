//! Comments and live comment feeds
//!
//! Creating a comment validates the thread it lands in, stores it, then
//! pushes it to everyone watching the parent post. A failed insert
//! publishes nothing; delivery results never undo the insert.

use super::error::{missing_as, require_live, ServiceError, ServiceResult};
use postboard_core::ports::{CommentFeed, CommentFilter, CommentStore, PostStore, UserStore};
use postboard_core::{Comment, EndpointId, Lookup, NewComment, PageRequest, Post, Subscription};
use std::sync::Arc;
use tracing::{debug, info};

pub struct CommentService {
    comments: Arc<dyn CommentStore>,
    posts: Arc<dyn PostStore>,
    users: Arc<dyn UserStore>,
    feed: Arc<dyn CommentFeed>,
    page_size: usize,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentStore>,
        posts: Arc<dyn PostStore>,
        users: Arc<dyn UserStore>,
        feed: Arc<dyn CommentFeed>,
        page_size: usize,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
            feed,
            page_size,
        }
    }

    pub async fn create_comment(&self, comment: NewComment) -> ServiceResult<Comment> {
        let post = self.open_post(&comment.parent_post_id).await?;
        if !self.users.user_exists(&comment.author_id).await? {
            return Err(ServiceError::AuthorNotFound(comment.author_id));
        }
        if let Some(parent_id) = &comment.parent_comment_id {
            let parent = self.live_comment(parent_id).await?;
            if parent.parent_post_id != post.id {
                return Err(ServiceError::ParentMismatch {
                    comment: parent.id,
                    post: post.id,
                });
            }
        }

        let comment = self.comments.insert_comment(comment).await?;
        info!(
            "Created comment: id={}, post={}, parent={:?}",
            comment.id, comment.parent_post_id, comment.parent_comment_id
        );

        let delivered = self
            .feed
            .publish(&comment.parent_post_id, comment.clone())
            .await;
        debug!(
            "Comment {} delivered to {} subscribers of post {}",
            comment.id, delivered, comment.parent_post_id
        );

        Ok(comment)
    }

    /// Top-level comments of a post, oldest first
    pub async fn post_comments(&self, post_id: &str, page: usize) -> ServiceResult<Vec<Comment>> {
        self.open_post(post_id).await?;
        let window = PageRequest::page(page, self.page_size);
        Ok(self
            .comments
            .list_comments(CommentFilter::top_level(post_id), window)
            .await?)
    }

    /// Direct replies to a comment, oldest first
    pub async fn replies(&self, comment_id: &str, page: usize) -> ServiceResult<Vec<Comment>> {
        self.get(comment_id).await?;
        let window = PageRequest::page(page, self.page_size);
        Ok(self
            .comments
            .list_comments(CommentFilter::replies(comment_id), window)
            .await?)
    }

    /// A live comment whose post still accepts comments
    pub async fn get(&self, id: &str) -> ServiceResult<Comment> {
        let comment = self.live_comment(id).await?;
        self.open_post(&comment.parent_post_id).await?;
        Ok(comment)
    }

    pub async fn update_body(&self, id: &str, body: String) -> ServiceResult<Comment> {
        let mut comment = self.get(id).await?;
        comment.body = body;
        Ok(self.comments.update_comment(comment).await?)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<Comment> {
        self.get(id).await?;
        let comment = self
            .comments
            .delete_comment(id)
            .await
            .map_err(|e| missing_as(e, ServiceError::CommentNotFound(id.to_string())))?;
        info!("Deleted comment: id={}", comment.id);
        Ok(comment)
    }

    /// Watch new comments on a live post
    pub async fn subscribe(&self, post_id: &str) -> ServiceResult<Subscription<Comment>> {
        self.live_post(post_id).await?;
        Ok(self.feed.subscribe(post_id))
    }

    pub fn unsubscribe(&self, post_id: &str, id: EndpointId) {
        self.feed.unsubscribe(post_id, id);
    }

    async fn live_post(&self, post_id: &str) -> ServiceResult<Post> {
        match self.posts.get_post(post_id).await? {
            Lookup::Found(post) => Ok(post),
            _ => Err(ServiceError::PostNotFound(post_id.to_string())),
        }
    }

    /// Live post that accepts comments
    async fn open_post(&self, post_id: &str) -> ServiceResult<Post> {
        let post = self.live_post(post_id).await?;
        if !post.allow_comments {
            return Err(ServiceError::CommentsDisabled(post.id));
        }
        Ok(post)
    }

    async fn live_comment(&self, id: &str) -> ServiceResult<Comment> {
        let lookup = self.comments.get_comment(id).await?;
        require_live(lookup, "comment", id, ServiceError::CommentNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postboard_core::memory::{MemoryCommentStore, MemoryPostStore, MemoryUserStore};
    use postboard_core::{NewPost, NewUser, SubscriptionBus};
    use std::time::Duration;
    use tokio::time::timeout;

    struct Fixture {
        service: Arc<CommentService>,
        bus: Arc<SubscriptionBus<Comment>>,
        users: Arc<MemoryUserStore>,
        posts: Arc<MemoryPostStore>,
    }

    fn fixture() -> Fixture {
        fixture_with_buffer(8)
    }

    fn fixture_with_buffer(buffer: usize) -> Fixture {
        let users = Arc::new(MemoryUserStore::new(4).unwrap());
        let posts = Arc::new(MemoryPostStore::new(4).unwrap());
        let comments = Arc::new(MemoryCommentStore::new(4).unwrap());
        let bus = Arc::new(SubscriptionBus::bounded(buffer));
        let service = Arc::new(CommentService::new(
            comments,
            posts.clone(),
            users.clone(),
            bus.clone(),
            10,
        ));
        Fixture {
            service,
            bus,
            users,
            posts,
        }
    }

    impl Fixture {
        async fn user(&self, username: &str) -> String {
            self.users
                .insert_user(NewUser {
                    username: username.to_string(),
                    email: format!("{}@example.com", username),
                })
                .await
                .unwrap()
                .id
        }

        async fn post(&self, author: &str, allow_comments: bool) -> String {
            self.posts
                .insert_post(NewPost {
                    author_id: author.to_string(),
                    title: "title".to_string(),
                    body: "body".to_string(),
                    allow_comments,
                })
                .await
                .unwrap()
                .id
        }
    }

    fn comment(author: &str, post: &str, parent: Option<&str>) -> NewComment {
        NewComment {
            author_id: author.to_string(),
            parent_post_id: post.to_string(),
            parent_comment_id: parent.map(str::to_string),
            body: "hello".to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscriber_receives_new_comment() {
        let f = fixture();
        let a = f.user("a").await;
        let b = f.user("b").await;
        let p = f.post(&a, true).await;

        let mut sub = f.service.subscribe(&p).await.unwrap();
        let created = f.service.create_comment(comment(&b, &p, None)).await.unwrap();

        let event = timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("no event within the wait")
            .expect("feed closed");
        assert_eq!(event, created);
        assert_eq!(event.author_id.as_deref(), Some(b.as_str()));
        assert_eq!(event.parent_post_id, p);
        assert!(event.parent_comment_id.is_none());
    }

    #[tokio::test]
    async fn test_rejected_comment_is_not_published() {
        let f = fixture();
        let a = f.user("a").await;
        let closed = f.post(&a, false).await;
        let mut sub = f.service.subscribe(&closed).await.unwrap();

        assert_eq!(
            f.service.create_comment(comment(&a, &closed, None)).await,
            Err(ServiceError::CommentsDisabled(closed.clone()))
        );
        assert_eq!(
            f.service.create_comment(comment(&a, "999", None)).await,
            Err(ServiceError::PostNotFound("999".to_string()))
        );
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_validation_order() {
        let f = fixture();
        let a = f.user("a").await;
        let p = f.post(&a, true).await;
        let other = f.post(&a, true).await;

        assert_eq!(
            f.service.create_comment(comment("404", &p, None)).await,
            Err(ServiceError::AuthorNotFound("404".to_string()))
        );
        assert_eq!(
            f.service.create_comment(comment(&a, &p, Some("77"))).await,
            Err(ServiceError::CommentNotFound("77".to_string()))
        );

        let root = f.service.create_comment(comment(&a, &p, None)).await.unwrap();
        assert_eq!(
            f.service
                .create_comment(comment(&a, &other, Some(&root.id)))
                .await,
            Err(ServiceError::ParentMismatch {
                comment: root.id.clone(),
                post: other.clone(),
            })
        );
    }

    #[tokio::test]
    async fn test_threads() {
        let f = fixture();
        let a = f.user("a").await;
        let p = f.post(&a, true).await;

        let root = f.service.create_comment(comment(&a, &p, None)).await.unwrap();
        let reply = f
            .service
            .create_comment(comment(&a, &p, Some(&root.id)))
            .await
            .unwrap();

        assert_eq!(f.service.post_comments(&p, 0).await.unwrap(), vec![root.clone()]);
        assert_eq!(f.service.replies(&root.id, 0).await.unwrap(), vec![reply.clone()]);

        let edited = f
            .service
            .update_body(&reply.id, "edited".to_string())
            .await
            .unwrap();
        assert_eq!(edited.body, "edited");
        assert_eq!(edited.parent_comment_id, Some(root.id.clone()));

        f.service.delete(&reply.id).await.unwrap();
        assert!(f.service.replies(&root.id, 0).await.unwrap().is_empty());
        assert_eq!(f.service.get(&reply.id).await.unwrap_err().code(), "deleted");
    }

    #[tokio::test]
    async fn test_closed_post_hides_its_comments() {
        let f = fixture();
        let a = f.user("a").await;
        let p = f.post(&a, true).await;
        let root = f.service.create_comment(comment(&a, &p, None)).await.unwrap();

        let mut closed = f.posts.get_post(&p).await.unwrap().found().unwrap();
        closed.allow_comments = false;
        f.posts.update_post(closed).await.unwrap();

        let disabled = ServiceError::CommentsDisabled(p.clone());
        assert_eq!(f.service.post_comments(&p, 0).await.unwrap_err(), disabled);
        assert_eq!(f.service.replies(&root.id, 0).await.unwrap_err(), disabled);
        assert_eq!(f.service.get(&root.id).await.unwrap_err(), disabled);
        assert_eq!(
            f.service
                .update_body(&root.id, "late".to_string())
                .await
                .unwrap_err(),
            disabled
        );
        assert_eq!(f.service.delete(&root.id).await.unwrap_err(), disabled);

        // Nothing changed underneath
        let stored = f.service.comments.get_comment(&root.id).await.unwrap();
        assert_eq!(stored, Lookup::Found(root));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_full_subscriber_queue_keeps_comment_committed() {
        let f = fixture_with_buffer(1);
        let a = f.user("a").await;
        let p = f.post(&a, true).await;

        let mut sub = f.service.subscribe(&p).await.unwrap();
        let first = f.service.create_comment(comment(&a, &p, None)).await.unwrap();

        // The queue holds `first`, so this publish waits for room
        let service = f.service.clone();
        let (author, post) = (a.clone(), p.clone());
        let pending = tokio::spawn(async move {
            service.create_comment(comment(&author, &post, None)).await
        });

        let second = timeout(Duration::from_secs(2), async {
            loop {
                let listed = f.service.post_comments(&p, 0).await.unwrap();
                if listed.len() == 2 {
                    break listed[1].clone();
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("second comment never stored");
        assert!(!pending.is_finished());
        assert_eq!(f.service.get(&second.id).await.unwrap(), second);

        assert_eq!(sub.recv().await, Some(first));
        let delivered = timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("second comment never delivered");
        assert_eq!(delivered, Some(second.clone()));

        let created = timeout(Duration::from_secs(2), pending)
            .await
            .expect("create_comment still blocked")
            .unwrap()
            .unwrap();
        assert_eq!(created, second);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let f = fixture();
        let a = f.user("a").await;
        let p = f.post(&a, true).await;

        let mut sub = f.service.subscribe(&p).await.unwrap();
        f.service.unsubscribe(&p, sub.id());
        assert_eq!(f.bus.subscriber_count(&p), 0);

        f.service.create_comment(comment(&a, &p, None)).await.unwrap();
        assert!(sub.try_recv().is_none());
    }
}
