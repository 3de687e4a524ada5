//! Comment types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment on a post, optionally replying to another comment of the same post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub parent_post_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_comment_id.is_none()
    }
}

/// Comment creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub author_id: String,
    pub parent_post_id: String,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    pub body: String,
}

impl NewComment {
    pub fn into_comment(self) -> Comment {
        Comment {
            id: String::new(),
            author_id: Some(self.author_id),
            parent_post_id: self.parent_post_id,
            parent_comment_id: self.parent_comment_id,
            body: self.body,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_are_camel_case() {
        let comment = NewComment {
            author_id: "2".to_string(),
            parent_post_id: "7".to_string(),
            parent_comment_id: None,
            body: "hello".to_string(),
        }
        .into_comment();

        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["authorId"], "2");
        assert_eq!(json["parentPostId"], "7");
        assert!(json.get("parentCommentId").is_none());
        assert!(json.get("deletedAt").is_none());
    }

    #[test]
    fn test_new_comment_parent_is_optional() {
        let input: NewComment =
            serde_json::from_str(r#"{"authorId":"1","parentPostId":"3","body":"hi"}"#).unwrap();
        assert!(input.parent_comment_id.is_none());
        assert!(input.into_comment().is_top_level());
    }
}
