//! Study room models.
//!
//! A room has two lives: the persisted record below, and an ephemeral
//! in-memory presence state owned by the signaling layer. The persisted
//! record is authoritative for ownership and access control; the live
//! state is authoritative for "who is here right now".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Persisted study room record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudyRoom {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub description: String,
    pub subject: String,
    pub category: String,
    /// "study" | "focus" | "private"
    pub room_type: String,
    pub max_participants: i32,
    pub is_private: bool,
    #[serde(skip_serializing)]
    pub access_code: Option<String>,
    pub background_music: String,
    pub study_timer: i32,
    pub break_timer: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The slice of a room record the signaling layer needs at join time:
/// who owns it, and whether an access code gates entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub is_private: bool,
    pub access_code: Option<String>,
}

impl From<&StudyRoom> for RoomRecord {
    fn from(room: &StudyRoom) -> Self {
        Self {
            id: room.id,
            owner_id: room.created_by,
            is_private: room.is_private,
            access_code: room.access_code.clone(),
        }
    }
}

/// Durable participant row — roughly mirrors live presence, best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoomParticipant {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub is_online: bool,
    pub joined_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Room creation request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 128, message = "Room name required"))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub subject: Option<String>,
    pub category: Option<String>,

    #[serde(default)]
    pub is_private: bool,

    /// Required when is_private is set.
    pub access_code: Option<String>,

    #[validate(range(min = 2, max = 100))]
    pub max_participants: Option<i32>,

    pub background_music: Option<String>,
    pub study_timer: Option<i32>,
    pub break_timer: Option<i32>,
}

/// Room list entry with participant counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub subject: String,
    pub category: String,
    pub owner: String,
    /// Durable participant count (room_participants with is_online).
    pub participants: i64,
    /// Live presence count from the signaling layer.
    pub active_users: usize,
    pub max_participants: i32,
    pub is_private: bool,
    pub background_music: String,
    pub study_timer: i32,
    pub break_timer: i32,
    pub created_at: DateTime<Utc>,
}

/// Focus room list entry — a slimmer projection for the focus-rooms page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusRoomSummary {
    pub id: Uuid,
    pub name: String,
    pub theme: String,
    pub participants: i64,
    pub capacity: i32,
    pub is_active: bool,
    pub ambient_sound: String,
}
