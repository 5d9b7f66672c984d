//! Study group models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Persisted study group.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudyGroup {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub subject: String,
    pub is_private: bool,
    #[serde(skip_serializing)]
    pub access_code: Option<String>,
    pub max_members: i32,
    pub created_at: DateTime<Utc>,
}

/// Group membership row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    /// "Admin" | "Member"
    pub role: String,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Persisted group chat message.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

/// Group creation request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 128, message = "Name required"))]
    pub name: String,

    #[validate(length(min = 1, max = 500, message = "Description required"))]
    pub description: String,

    #[validate(length(min = 1, max = 64, message = "Category required"))]
    pub category: String,

    pub subject: Option<String>,

    #[serde(default)]
    pub is_private: bool,

    pub access_code: Option<String>,

    #[validate(range(min = 2, max = 500))]
    pub max_members: Option<i32>,
}
