//! Post model: a blog entry on the studio site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::PublishStatus;

/// A blog post. Posts carry no entitlement-relevant data.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Unique identifier.
    pub id: Uuid,
    /// URL slug, unique across posts.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Short teaser shown in listings.
    pub summary: Option<String>,
    /// Full post body.
    pub content: String,
    /// Draft or published.
    pub status: PublishStatus,
    /// Optional category name.
    pub category: Option<String>,
    /// Optional free-form tags.
    pub tags: Option<Vec<String>>,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new post (created as a draft).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_serializes_camel_case() {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            slug: "hello-world".to_string(),
            title: "Hello World".to_string(),
            summary: None,
            content: "First post.".to_string(),
            status: PublishStatus::Draft,
            category: None,
            tags: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["slug"], "hello-world");
        assert_eq!(json["status"], "draft");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_new_post_defaults() {
        let json = r#"{"slug": "a", "title": "A", "content": "body"}"#;
        let new_post: NewPost = serde_json::from_str(json).unwrap();
        assert!(new_post.summary.is_none());
        assert!(new_post.tags.is_none());
    }
}
