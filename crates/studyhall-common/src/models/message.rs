//! Room chat, pinned messages, and direct messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Persisted room chat message.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoomMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub message_type: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// A pin record — references a room message.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PinnedMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub message_id: Uuid,
    pub pinned_by_user_id: Uuid,
    pub pinned_at: DateTime<Utc>,
}

/// Persisted direct message between two users.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DirectMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message: String,
    pub message_type: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for sending a room or group message over REST.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "Message is required"))]
    pub message: String,
}

/// Request body for sending a direct message.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendDirectMessageRequest {
    pub user_id: Uuid,

    #[validate(length(min = 1, max = 2000, message = "Content required"))]
    pub content: String,

    #[serde(default = "default_message_type")]
    pub r#type: String,
}

fn default_message_type() -> String {
    "text".to_string()
}
