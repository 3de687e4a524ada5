//! Users: primary store by id plus a unique index by username

use crate::error::{Result, StoreError};
use crate::ids::IdSequence;
use crate::memory::require_live;
use crate::ports::UserStore;
use crate::record::Lookup;
use crate::shard::{SecondaryIndex, ShardedStore};
use async_trait::async_trait;
use postboard_types::{NewUser, User};
use tracing::debug;

pub struct MemoryUserStore {
    by_id: ShardedStore<User>,
    by_username: SecondaryIndex,
    ids: IdSequence,
}

impl MemoryUserStore {
    pub fn new(shard_count: usize) -> Result<Self> {
        Ok(Self {
            by_id: ShardedStore::new("user", shard_count)?,
            by_username: SecondaryIndex::new("username", shard_count)?,
            ids: IdSequence::new(),
        })
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_user(&self, id: &str) -> Result<Lookup<User>> {
        Ok(self.by_id.get(id).await)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Lookup<User>> {
        match self.by_username.get(username).await {
            Lookup::Found(id) | Lookup::Deleted(id) => Ok(self.by_id.get(&id).await),
            Lookup::NotFound => Ok(Lookup::NotFound),
        }
    }

    async fn user_exists(&self, id: &str) -> Result<bool> {
        Ok(self.by_id.contains_live(id).await)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let user = user.into_user();

        // Index slot first, held across the primary insert
        let slot = self.by_username.lock(&user.username).await;
        slot.ensure_vacant()?;

        let id = self.ids.next_id();
        let stored = self.by_id.insert(&id, user).await?;
        slot.bind(&stored.id)?;

        debug!("User {} stored as {}", stored.username, stored.id);
        Ok(stored)
    }

    async fn update_user(&self, user: User) -> Result<User> {
        let id = user.id.clone();
        self.by_id
            .update(&id, |stored| {
                if stored.username != user.username {
                    return Err(StoreError::Conflict(format!(
                        "username of user {} cannot change",
                        id
                    )));
                }
                stored.email = user.email;
                Ok(())
            })
            .await
    }

    async fn delete_user(&self, id: &str) -> Result<User> {
        let username = require_live(self.by_id.get(id).await, "user", id)?.username;

        let slot = self.by_username.lock(&username).await;
        let deleted = self.by_id.soft_delete(id).await?;
        slot.retire(id)?;

        debug!("User {} deleted, username {} released", id, username);
        Ok(deleted)
    }
}
