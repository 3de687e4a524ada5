//! Post types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post that comments hang off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub title: String,
    pub body: String,
    pub allow_comments: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Post creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub author_id: String,
    pub title: String,
    pub body: String,
    #[serde(default = "default_allow_comments")]
    pub allow_comments: bool,
}

fn default_allow_comments() -> bool {
    true
}

impl NewPost {
    pub fn into_post(self) -> Post {
        Post {
            id: String::new(),
            author_id: Some(self.author_id),
            title: self.title,
            body: self.body,
            allow_comments: self.allow_comments,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

/// Partial post edit. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub allow_comments: Option<bool>,
}

impl PostUpdate {
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(body) = self.body {
            post.body = body;
        }
        if let Some(allow_comments) = self.allow_comments {
            post.allow_comments = allow_comments;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_defaults_to_open_comments() {
        let post: NewPost =
            serde_json::from_str(r#"{"authorId":"1","title":"t","body":"b"}"#).unwrap();
        assert!(post.allow_comments);
    }

    #[test]
    fn test_update_keeps_absent_fields() {
        let mut post = NewPost {
            author_id: "1".to_string(),
            title: "old".to_string(),
            body: "text".to_string(),
            allow_comments: true,
        }
        .into_post();

        let update: PostUpdate = serde_json::from_str(r#"{"allowComments":false}"#).unwrap();
        update.apply(&mut post);
        assert_eq!(post.title, "old");
        assert!(!post.allow_comments);
    }
}
