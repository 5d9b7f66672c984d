//! Study-room and focus-room routes.
//!
//! The listing endpoints cache the database-derived part of the response
//! and overlay live presence counts from the signaling hub on every
//! request, so a cached list still shows who is in a room right now.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studyhall_common::{
    models::{
        message::SendMessageRequest,
        room::{CreateRoomRequest, FocusRoomSummary, RoomSummary, StudyRoom},
    },
    validation::{require_text, validate_request},
    HallError, HallResult,
};
use studyhall_db::repository::{messages, rooms};
use uuid::Uuid;

use crate::{middleware::AuthContext, AppState};

const ROOM_LIST_KEY: &str = "rooms:study-list";
const FOCUS_LIST_KEY: &str = "rooms:focus-list";

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/study-rooms", get(list_study_rooms).post(create_room))
        .route("/study-rooms/{id}", get(get_room))
        .route("/study-rooms/{id}/participants", get(get_participants))
        .route(
            "/study-rooms/{id}/messages",
            get(get_messages).post(post_message),
        )
        .route("/study-rooms/{id}/pins", get(get_pins))
        .route("/focus-rooms", get(list_focus_rooms))
        .route("/focus-rooms/{id}/join", post(join_focus_room))
        .route("/focus-rooms/{id}/leave", post(leave_focus_room))
}

/// GET /api/v1/study-rooms
async fn list_study_rooms(
    State(state): State<Arc<AppState>>,
) -> HallResult<Json<Vec<RoomSummary>>> {
    let config = studyhall_common::config::get();

    let mut summaries: Vec<RoomSummary> = match state.cache.get(ROOM_LIST_KEY).await {
        Some(cached) => cached,
        None => {
            let rows = rooms::list_study_rooms(&state.db.pool).await?;
            let summaries: Vec<RoomSummary> = rows
                .into_iter()
                .map(|row| RoomSummary {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    subject: row.subject,
                    category: row.category,
                    owner: row.owner_name,
                    participants: row.online_count,
                    active_users: 0,
                    max_participants: row.max_participants,
                    is_private: row.is_private,
                    background_music: row.background_music,
                    study_timer: row.study_timer,
                    break_timer: row.break_timer,
                    created_at: row.created_at,
                })
                .collect();
            state
                .cache
                .set(ROOM_LIST_KEY, &summaries, config.cache.room_list_ttl_secs)
                .await;
            summaries
        }
    };

    for summary in &mut summaries {
        summary.active_users = state.hub.active_users_in(summary.id).await;
    }

    Ok(Json(summaries))
}

/// POST /api/v1/study-rooms
async fn create_room(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateRoomRequest>,
) -> HallResult<Json<StudyRoom>> {
    validate_request(&body)?;

    if body.is_private && body.access_code.as_deref().map_or(true, str::is_empty) {
        return Err(HallError::Validation {
            message: "Private rooms require an access code".into(),
        });
    }

    let config = studyhall_common::config::get();
    let room = rooms::create_room(
        &state.db.pool,
        auth.user_id,
        &body.name,
        body.description.as_deref().unwrap_or(""),
        body.subject.as_deref().unwrap_or("General"),
        body.category.as_deref().unwrap_or("general"),
        body.is_private,
        body.access_code.as_deref(),
        body.max_participants
            .unwrap_or(config.limits.default_room_capacity as i32),
        body.background_music.as_deref().unwrap_or("lofi"),
        body.study_timer.unwrap_or(25),
        body.break_timer.unwrap_or(5),
    )
    .await?;

    state.cache.del(ROOM_LIST_KEY).await;
    tracing::info!(room_id = %room.id, owner = %auth.user_id, "Study room created");

    Ok(Json(room))
}

/// GET /api/v1/study-rooms/{id}
async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<Uuid>,
) -> HallResult<Json<StudyRoom>> {
    let room = rooms::find_by_id(&state.db.pool, room_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Room".into(),
        })?;
    Ok(Json(room))
}

#[derive(Serialize)]
struct ParticipantView {
    user_id: Uuid,
    name: String,
    avatar: Option<String>,
    joined_at: chrono::DateTime<chrono::Utc>,
}

/// GET /api/v1/study-rooms/{id}/participants
///
/// Live presence when the room has signaling members; the durable
/// participant rows otherwise (focus rooms have no live state).
async fn get_participants(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<Uuid>,
) -> HallResult<Json<Vec<ParticipantView>>> {
    let live = state.hub.presence.get_presence(room_id).await;
    if !live.is_empty() {
        let views = live
            .into_iter()
            .map(|entry| ParticipantView {
                user_id: entry.user_id,
                name: entry.display_name,
                avatar: entry.display_avatar,
                joined_at: entry.joined_at,
            })
            .collect();
        return Ok(Json(views));
    }

    let rows = rooms::list_online_participants(&state.db.pool, room_id).await?;
    let views = rows
        .into_iter()
        .map(|row| ParticipantView {
            user_id: row.user_id,
            name: row.name,
            avatar: row.avatar_url,
            joined_at: row.joined_at,
        })
        .collect();
    Ok(Json(views))
}

#[derive(Serialize)]
struct MessageView {
    id: Uuid,
    message: String,
    user_id: Uuid,
    name: String,
    avatar: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

/// GET /api/v1/study-rooms/{id}/messages
async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> HallResult<Json<Vec<MessageView>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let rows = messages::list_room_messages(&state.db.pool, room_id, limit).await?;
    let views = rows
        .into_iter()
        .map(|row| MessageView {
            id: row.id,
            message: row.message,
            user_id: row.user_id,
            name: row.name,
            avatar: row.avatar_url,
            created_at: row.created_at,
        })
        .collect();
    Ok(Json(views))
}

/// POST /api/v1/study-rooms/{id}/messages
///
/// Durable write only — live members receive chat through the signaling
/// channel, not through this endpoint.
async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(room_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> HallResult<Json<studyhall_common::models::message::RoomMessage>> {
    validate_request(&body)?;
    require_text(&body.message, "Message")?;

    rooms::find_by_id(&state.db.pool, room_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Room".into(),
        })?;

    let message = messages::insert_room_message(
        &state.db.pool,
        Uuid::new_v4(),
        room_id,
        auth.user_id,
        body.message.trim(),
    )
    .await?;
    Ok(Json(message))
}

#[derive(Serialize)]
struct PinView {
    id: Uuid,
    message_id: Uuid,
    message: String,
    author_name: String,
    author_avatar: Option<String>,
    message_created_at: chrono::DateTime<chrono::Utc>,
    pinned_at: chrono::DateTime<chrono::Utc>,
}

/// GET /api/v1/study-rooms/{id}/pins
async fn get_pins(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<Uuid>,
) -> HallResult<Json<Vec<PinView>>> {
    let rows = messages::list_pins(&state.db.pool, room_id).await?;
    let views = rows
        .into_iter()
        .map(|row| PinView {
            id: row.id,
            message_id: row.message_id,
            message: row.message,
            author_name: row.author_name,
            author_avatar: row.author_avatar,
            message_created_at: row.message_created_at,
            pinned_at: row.pinned_at,
        })
        .collect();
    Ok(Json(views))
}

/// GET /api/v1/focus-rooms
async fn list_focus_rooms(
    State(state): State<Arc<AppState>>,
) -> HallResult<Json<Vec<FocusRoomSummary>>> {
    let config = studyhall_common::config::get();

    let summaries: Vec<FocusRoomSummary> = match state.cache.get(FOCUS_LIST_KEY).await {
        Some(cached) => cached,
        None => {
            let rows = rooms::list_focus_rooms(&state.db.pool).await?;
            let summaries: Vec<FocusRoomSummary> = rows
                .into_iter()
                .map(|row| FocusRoomSummary {
                    id: row.id,
                    name: row.name,
                    theme: row.category,
                    participants: row.online_count,
                    capacity: row.max_participants,
                    is_active: row.is_active,
                    ambient_sound: row.background_music,
                })
                .collect();
            state
                .cache
                .set(FOCUS_LIST_KEY, &summaries, config.cache.room_list_ttl_secs)
                .await;
            summaries
        }
    };

    Ok(Json(summaries))
}

#[derive(Serialize)]
struct FocusMembershipResponse {
    room_id: Uuid,
    participants: i64,
}

/// POST /api/v1/focus-rooms/{id}/join
///
/// Focus rooms are presence-only: no chat, no WebRTC, just a durable
/// participant row flipped online.
async fn join_focus_room(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(room_id): Path<Uuid>,
) -> HallResult<Json<FocusMembershipResponse>> {
    let room = rooms::find_by_id(&state.db.pool, room_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Room".into(),
        })?;

    let online = rooms::count_online(&state.db.pool, room_id).await?;
    if online >= room.max_participants as i64 {
        return Err(HallError::Validation {
            message: "Room is full".into(),
        });
    }

    rooms::set_participant_online(&state.db.pool, room_id, auth.user_id, true).await?;
    state.cache.del(FOCUS_LIST_KEY).await;

    let participants = rooms::count_online(&state.db.pool, room_id).await?;
    Ok(Json(FocusMembershipResponse {
        room_id,
        participants,
    }))
}

/// POST /api/v1/focus-rooms/{id}/leave
async fn leave_focus_room(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(room_id): Path<Uuid>,
) -> HallResult<Json<FocusMembershipResponse>> {
    rooms::set_participant_online(&state.db.pool, room_id, auth.user_id, false).await?;
    state.cache.del(FOCUS_LIST_KEY).await;

    let participants = rooms::count_online(&state.db.pool, room_id).await?;
    Ok(Json(FocusMembershipResponse {
        room_id,
        participants,
    }))
}
