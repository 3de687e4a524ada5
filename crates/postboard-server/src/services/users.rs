//! User accounts

use super::error::{missing_as, require_live, ServiceError, ServiceResult};
use postboard_core::ports::UserStore;
use postboard_core::{NewUser, User};
use std::sync::Arc;
use tracing::info;

pub struct UserService {
    users: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn get(&self, id: &str) -> ServiceResult<User> {
        let lookup = self.users.get_user(id).await?;
        require_live(lookup, "user", id, ServiceError::UserNotFound)
    }

    pub async fn get_by_username(&self, username: &str) -> ServiceResult<User> {
        let lookup = self.users.get_user_by_username(username).await?;
        require_live(lookup, "user", username, ServiceError::UserNotFound)
    }

    pub async fn create(&self, user: NewUser) -> ServiceResult<User> {
        let user = self.users.insert_user(user).await?;
        info!("Created user: id={}, username={}", user.id, user.username);
        Ok(user)
    }

    pub async fn update_email(&self, id: &str, email: String) -> ServiceResult<User> {
        let mut user = self.get(id).await?;
        user.email = email;
        Ok(self.users.update_user(user).await?)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<User> {
        let user = self
            .users
            .delete_user(id)
            .await
            .map_err(|e| missing_as(e, ServiceError::UserNotFound(id.to_string())))?;
        info!("Deleted user: id={}, username={}", user.id, user.username);
        Ok(user)
    }
}
