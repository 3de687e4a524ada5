//! Comments

use crate::error::Result;
use crate::ids::IdSequence;
use crate::ports::{CommentFilter, CommentStore};
use crate::record::Lookup;
use crate::shard::ShardedStore;
use async_trait::async_trait;
use postboard_types::{Comment, NewComment, PageRequest};

pub struct MemoryCommentStore {
    by_id: ShardedStore<Comment>,
    ids: IdSequence,
}

impl MemoryCommentStore {
    pub fn new(shard_count: usize) -> Result<Self> {
        Ok(Self {
            by_id: ShardedStore::new("comment", shard_count)?,
            ids: IdSequence::new(),
        })
    }
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn get_comment(&self, id: &str) -> Result<Lookup<Comment>> {
        Ok(self.by_id.get(id).await)
    }

    async fn comment_exists(&self, id: &str) -> Result<bool> {
        Ok(self.by_id.contains_live(id).await)
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        let id = self.ids.next_id();
        self.by_id.insert(&id, comment.into_comment()).await
    }

    async fn update_comment(&self, comment: Comment) -> Result<Comment> {
        self.by_id
            .update(&comment.id, |stored| {
                stored.body = comment.body.clone();
                Ok(())
            })
            .await
    }

    async fn delete_comment(&self, id: &str) -> Result<Comment> {
        self.by_id.soft_delete(id).await
    }

    async fn list_comments(
        &self,
        filter: CommentFilter,
        page: PageRequest,
    ) -> Result<Vec<Comment>> {
        Ok(self
            .by_id
            .list_page(move |comment| filter.matches(comment), page)
            .await)
    }
}
