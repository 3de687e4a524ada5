//! Posts

use crate::error::Result;
use crate::ids::IdSequence;
use crate::ports::PostStore;
use crate::record::Lookup;
use crate::shard::ShardedStore;
use async_trait::async_trait;
use postboard_types::{NewPost, PageRequest, Post};

pub struct MemoryPostStore {
    by_id: ShardedStore<Post>,
    ids: IdSequence,
}

impl MemoryPostStore {
    pub fn new(shard_count: usize) -> Result<Self> {
        Ok(Self {
            by_id: ShardedStore::new("post", shard_count)?,
            ids: IdSequence::new(),
        })
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn get_post(&self, id: &str) -> Result<Lookup<Post>> {
        Ok(self.by_id.get(id).await)
    }

    async fn post_exists(&self, id: &str) -> Result<bool> {
        Ok(self.by_id.contains_live(id).await)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let id = self.ids.next_id();
        self.by_id.insert(&id, post.into_post()).await
    }

    async fn update_post(&self, post: Post) -> Result<Post> {
        self.by_id
            .update(&post.id, |stored| {
                stored.title = post.title.clone();
                stored.body = post.body.clone();
                stored.allow_comments = post.allow_comments;
                Ok(())
            })
            .await
    }

    async fn delete_post(&self, id: &str) -> Result<Post> {
        self.by_id.soft_delete(id).await
    }

    async fn list_posts(&self, page: PageRequest) -> Result<Vec<Post>> {
        Ok(self.by_id.list_page(|_| true, page).await)
    }
}
