//! Message repository — room chat history, pins, and direct messages.

use studyhall_common::models::message::{DirectMessage, PinnedMessage, RoomMessage};
use sqlx::PgPool;
use uuid::Uuid;

/// Persist a room chat message. Called by both the REST endpoint and the
/// signaling layer's durable write (which runs alongside the live relay).
/// The caller supplies the id so the live relay copy and the durable row
/// agree on the message identity.
pub async fn insert_room_message(
    pool: &PgPool,
    id: Uuid,
    room_id: Uuid,
    user_id: Uuid,
    message: &str,
) -> Result<RoomMessage, sqlx::Error> {
    sqlx::query_as::<_, RoomMessage>(
        r#"
        INSERT INTO room_messages (id, room_id, user_id, message)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(room_id)
    .bind(user_id)
    .bind(message)
    .fetch_one(pool)
    .await
}

/// Room message with author display fields.
#[derive(Debug, sqlx::FromRow)]
pub struct RoomMessageRow {
    pub id: Uuid,
    pub message: String,
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Chronological message history for a room (most recent `limit`).
pub async fn list_room_messages(
    pool: &PgPool,
    room_id: Uuid,
    limit: i64,
) -> Result<Vec<RoomMessageRow>, sqlx::Error> {
    sqlx::query_as::<_, RoomMessageRow>(
        r#"
        SELECT rm.id, rm.message, rm.user_id, up.name, up.avatar_url, rm.created_at
        FROM room_messages rm
        JOIN user_profiles up ON up.user_id = rm.user_id
        WHERE rm.room_id = $1 AND NOT rm.is_deleted
        ORDER BY rm.created_at
        LIMIT $2
        "#,
    )
    .bind(room_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Record a pin. Fails if the message is already pinned in this room.
pub async fn insert_pin(
    pool: &PgPool,
    room_id: Uuid,
    message_id: Uuid,
    pinned_by: Uuid,
) -> Result<PinnedMessage, sqlx::Error> {
    sqlx::query_as::<_, PinnedMessage>(
        r#"
        INSERT INTO pinned_messages (room_id, message_id, pinned_by_user_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(room_id)
    .bind(message_id)
    .bind(pinned_by)
    .fetch_one(pool)
    .await
}

/// Pin with the pinned message and its author, newest pin first.
#[derive(Debug, sqlx::FromRow)]
pub struct PinRow {
    pub id: Uuid,
    pub message_id: Uuid,
    pub message: String,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub message_created_at: chrono::DateTime<chrono::Utc>,
    pub pinned_at: chrono::DateTime<chrono::Utc>,
}

pub async fn list_pins(pool: &PgPool, room_id: Uuid) -> Result<Vec<PinRow>, sqlx::Error> {
    sqlx::query_as::<_, PinRow>(
        r#"
        SELECT pm.id, pm.message_id, rm.message,
               up.name AS author_name, up.avatar_url AS author_avatar,
               rm.created_at AS message_created_at, pm.pinned_at
        FROM pinned_messages pm
        JOIN room_messages rm ON rm.id = pm.message_id
        JOIN user_profiles up ON up.user_id = rm.user_id
        WHERE pm.room_id = $1
        ORDER BY pm.pinned_at DESC
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await
}

/// Persist a direct message.
pub async fn insert_direct_message(
    pool: &PgPool,
    sender_id: Uuid,
    receiver_id: Uuid,
    message: &str,
    message_type: &str,
) -> Result<DirectMessage, sqlx::Error> {
    sqlx::query_as::<_, DirectMessage>(
        r#"
        INSERT INTO direct_messages (sender_id, receiver_id, message, message_type)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(sender_id)
    .bind(receiver_id)
    .bind(message)
    .bind(message_type)
    .fetch_one(pool)
    .await
}

/// Two-party conversation, oldest first.
pub async fn list_conversation(
    pool: &PgPool,
    user_a: Uuid,
    user_b: Uuid,
    limit: i64,
) -> Result<Vec<DirectMessage>, sqlx::Error> {
    sqlx::query_as::<_, DirectMessage>(
        r#"
        SELECT * FROM direct_messages
        WHERE (sender_id = $1 AND receiver_id = $2)
           OR (sender_id = $2 AND receiver_id = $1)
        ORDER BY created_at
        LIMIT $3
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .bind(limit)
    .fetch_all(pool)
    .await
}
