//! Social feed models — posts, comments, likes, bookmarks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Persisted social post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SocialPost {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub post_type: String,
    pub image_url: Option<String>,
    pub study_subject: Option<String>,
    pub study_hours: i32,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    pub is_pinned: bool,
    pub original_post_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Persisted comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub likes_count: i64,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// Post creation request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 4000, message = "Content required"))]
    pub content: String,

    #[serde(default = "default_post_type", rename = "type")]
    pub post_type: String,

    pub image_url: Option<String>,
    pub study_subject: Option<String>,
    pub study_hours: Option<i32>,
}

fn default_post_type() -> String {
    "general".to_string()
}

/// Comment creation request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "Comment required"))]
    pub content: String,
}

/// Compact author card embedded in feed responses.
#[derive(Debug, Clone, Serialize)]
pub struct PostAuthor {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub streak: i32,
}
