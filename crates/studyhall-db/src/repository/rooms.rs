//! Study room repository — room records and durable participant rows.
//!
//! The signaling layer consults `room_record` once at join time for
//! ownership and access-code checks, and fires `set_participant_online`
//! as a best-effort mirror of live presence.

use studyhall_common::models::room::{RoomRecord, StudyRoom};
use sqlx::PgPool;
use uuid::Uuid;

/// Create a study room; the creator becomes its owner participant.
#[allow(clippy::too_many_arguments)]
pub async fn create_room(
    pool: &PgPool,
    created_by: Uuid,
    name: &str,
    description: &str,
    subject: &str,
    category: &str,
    is_private: bool,
    access_code: Option<&str>,
    max_participants: i32,
    background_music: &str,
    study_timer: i32,
    break_timer: i32,
) -> Result<StudyRoom, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let room = sqlx::query_as::<_, StudyRoom>(
        r#"
        INSERT INTO study_rooms
            (created_by, name, description, subject, category, room_type,
             max_participants, is_private, access_code, background_music,
             study_timer, break_timer)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(created_by)
    .bind(name)
    .bind(description)
    .bind(subject)
    .bind(category)
    .bind(if is_private { "private" } else { "study" })
    .bind(max_participants)
    .bind(is_private)
    .bind(access_code)
    .bind(background_music)
    .bind(study_timer)
    .bind(break_timer)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO room_participants (room_id, user_id, role) VALUES ($1, $2, 'owner')",
    )
    .bind(room.id)
    .bind(created_by)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(room)
}

/// Find a room by ID.
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<StudyRoom>, sqlx::Error> {
    sqlx::query_as::<_, StudyRoom>("SELECT * FROM study_rooms WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Fetch the access-control slice of a room record.
pub async fn room_record(pool: &PgPool, id: Uuid) -> Result<Option<RoomRecord>, sqlx::Error> {
    let row: Option<(Uuid, Uuid, bool, Option<String>)> = sqlx::query_as(
        "SELECT id, created_by, is_private, access_code FROM study_rooms WHERE id = $1 AND is_active",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, owner_id, is_private, access_code)| RoomRecord {
        id,
        owner_id,
        is_private,
        access_code,
    }))
}

/// Room listing row with the owner's display name and the durable online count.
#[derive(Debug, sqlx::FromRow)]
pub struct RoomListRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub subject: String,
    pub category: String,
    pub room_type: String,
    pub max_participants: i32,
    pub is_private: bool,
    pub background_music: String,
    pub study_timer: i32,
    pub break_timer: i32,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub owner_name: String,
    pub online_count: i64,
}

const ROOM_LIST_SELECT: &str = r#"
    SELECT sr.id, sr.name, sr.description, sr.subject, sr.category, sr.room_type,
           sr.max_participants, sr.is_private, sr.background_music,
           sr.study_timer, sr.break_timer, sr.is_active, sr.created_at,
           up.name AS owner_name,
           (SELECT COUNT(*) FROM room_participants rp
            WHERE rp.room_id = sr.id AND rp.is_online) AS online_count
    FROM study_rooms sr
    JOIN user_profiles up ON up.user_id = sr.created_by
"#;

/// List active study rooms (everything but focus rooms), newest first.
pub async fn list_study_rooms(pool: &PgPool) -> Result<Vec<RoomListRow>, sqlx::Error> {
    sqlx::query_as::<_, RoomListRow>(&format!(
        "{ROOM_LIST_SELECT} WHERE sr.is_active AND sr.room_type <> 'focus' ORDER BY sr.created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

/// List active focus rooms, newest first.
pub async fn list_focus_rooms(pool: &PgPool) -> Result<Vec<RoomListRow>, sqlx::Error> {
    sqlx::query_as::<_, RoomListRow>(&format!(
        "{ROOM_LIST_SELECT} WHERE sr.is_active AND sr.room_type = 'focus' ORDER BY sr.created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Count durable online participants for a room.
pub async fn count_online(pool: &PgPool, room_id: Uuid) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM room_participants WHERE room_id = $1 AND is_online",
    )
    .bind(room_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Upsert a participant row and mark it online/offline.
pub async fn set_participant_online(
    pool: &PgPool,
    room_id: Uuid,
    user_id: Uuid,
    online: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO room_participants (room_id, user_id, is_online, last_seen)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (room_id, user_id)
        DO UPDATE SET is_online = $3, last_seen = NOW()
        "#,
    )
    .bind(room_id)
    .bind(user_id)
    .bind(online)
    .execute(pool)
    .await?;
    Ok(())
}

/// Durable online participants with display fields, for the REST surface.
#[derive(Debug, sqlx::FromRow)]
pub struct ParticipantRow {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub joined_at: chrono::DateTime<chrono::Utc>,
    pub is_online: bool,
}

pub async fn list_online_participants(
    pool: &PgPool,
    room_id: Uuid,
) -> Result<Vec<ParticipantRow>, sqlx::Error> {
    sqlx::query_as::<_, ParticipantRow>(
        r#"
        SELECT rp.user_id, up.name, up.avatar_url, rp.joined_at, rp.is_online
        FROM room_participants rp
        JOIN user_profiles up ON up.user_id = rp.user_id
        WHERE rp.room_id = $1 AND rp.is_online
        ORDER BY rp.joined_at
        "#,
    )
    .bind(room_id)
    .fetch_all(pool)
    .await
}

/// Count all rooms (for the health endpoint).
pub async fn count_rooms(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM study_rooms")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
