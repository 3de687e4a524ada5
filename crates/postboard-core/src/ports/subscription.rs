//! Live comment feed, keyed by post id

use crate::bus::{EndpointId, Subscription, SubscriptionBus};
use async_trait::async_trait;
use postboard_types::Comment;

#[async_trait]
pub trait CommentFeed: Send + Sync {
    fn subscribe(&self, post_id: &str) -> Subscription<Comment>;
    fn unsubscribe(&self, post_id: &str, id: EndpointId);
    /// Returns how many subscribers received the comment
    async fn publish(&self, post_id: &str, comment: Comment) -> usize;
}

#[async_trait]
impl CommentFeed for SubscriptionBus<Comment> {
    fn subscribe(&self, post_id: &str) -> Subscription<Comment> {
        SubscriptionBus::subscribe(self, post_id)
    }

    fn unsubscribe(&self, post_id: &str, id: EndpointId) {
        SubscriptionBus::unsubscribe(self, post_id, id);
    }

    async fn publish(&self, post_id: &str, comment: Comment) -> usize {
        SubscriptionBus::publish(self, post_id, comment).await
    }
}
