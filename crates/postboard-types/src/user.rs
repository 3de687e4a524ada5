//! User types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

impl NewUser {
    /// Build the record to insert. Id and creation time are placeholders
    /// until the store assigns them.
    pub fn into_user(self) -> User {
        User {
            id: String::new(),
            username: self.username,
            email: self.email,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}
