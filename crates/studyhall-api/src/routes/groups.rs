//! Study-group routes. Group chat is REST-polled, not pushed — only
//! study rooms get the live signaling channel.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studyhall_common::{
    models::group::{CreateGroupRequest, GroupMessage, StudyGroup},
    validation::{require_text, validate_request},
    HallError, HallResult,
};
use studyhall_db::repository::groups;
use uuid::Uuid;

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}/join", post(join_group))
        .route("/groups/{id}/leave", post(leave_group))
        .route(
            "/groups/{id}/messages",
            get(list_messages).post(send_message),
        )
}

fn list_cache_key(user_id: Uuid) -> String {
    format!("groups:list:{user_id}")
}

/// Group listing entry. Cached per viewer because membership flags differ.
#[derive(Serialize, Deserialize, Clone)]
struct GroupView {
    id: Uuid,
    name: String,
    description: String,
    category: String,
    subject: String,
    is_private: bool,
    max_members: i32,
    member_count: i64,
    is_member: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// GET /api/v1/groups
async fn list_groups(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> HallResult<Json<Vec<GroupView>>> {
    let key = list_cache_key(auth.user_id);
    if let Some(cached) = state.cache.get::<Vec<GroupView>>(&key).await {
        return Ok(Json(cached));
    }

    let rows = groups::list_groups(&state.db.pool, auth.user_id).await?;
    let views: Vec<GroupView> = rows
        .into_iter()
        .map(|row| GroupView {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            subject: row.subject,
            is_private: row.is_private,
            max_members: row.max_members,
            member_count: row.member_count,
            is_member: row.viewer_is_member,
            created_at: row.created_at,
        })
        .collect();

    let config = studyhall_common::config::get();
    state
        .cache
        .set(&key, &views, config.cache.group_list_ttl_secs)
        .await;
    Ok(Json(views))
}

/// POST /api/v1/groups
async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateGroupRequest>,
) -> HallResult<Json<StudyGroup>> {
    validate_request(&body)?;

    if body.is_private && body.access_code.as_deref().map_or(true, str::is_empty) {
        return Err(HallError::Validation {
            message: "Private groups require an access code".into(),
        });
    }

    let group = groups::create_group(
        &state.db.pool,
        auth.user_id,
        &body.name,
        &body.description,
        &body.category,
        body.subject.as_deref().unwrap_or("General"),
        body.is_private,
        body.access_code.as_deref(),
        body.max_members.unwrap_or(20),
    )
    .await?;

    state.cache.del(&list_cache_key(auth.user_id)).await;
    tracing::info!(group_id = %group.id, owner = %auth.user_id, "Study group created");

    Ok(Json(group))
}

#[derive(Serialize)]
struct MembershipResponse {
    group_id: Uuid,
    member_count: i64,
}

/// POST /api/v1/groups/{id}/join
async fn join_group(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> HallResult<Json<MembershipResponse>> {
    let group = groups::find_by_id(&state.db.pool, group_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Group".into(),
        })?;

    let count = groups::member_count(&state.db.pool, group_id).await?;
    if count >= group.max_members as i64 {
        return Err(HallError::Validation {
            message: "Group is full".into(),
        });
    }

    groups::join_group(&state.db.pool, group_id, auth.user_id).await?;
    state.cache.del(&list_cache_key(auth.user_id)).await;

    let member_count = groups::member_count(&state.db.pool, group_id).await?;
    Ok(Json(MembershipResponse {
        group_id,
        member_count,
    }))
}

/// POST /api/v1/groups/{id}/leave
async fn leave_group(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> HallResult<Json<MembershipResponse>> {
    let left = groups::leave_group(&state.db.pool, group_id, auth.user_id).await?;
    if !left {
        return Err(HallError::NotFound {
            resource: "Membership".into(),
        });
    }
    state.cache.del(&list_cache_key(auth.user_id)).await;

    let member_count = groups::member_count(&state.db.pool, group_id).await?;
    Ok(Json(MembershipResponse {
        group_id,
        member_count,
    }))
}

#[derive(Serialize)]
struct GroupMessageView {
    id: Uuid,
    user_id: Uuid,
    name: String,
    avatar: Option<String>,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

/// GET /api/v1/groups/{id}/messages — members only.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> HallResult<Json<Vec<GroupMessageView>>> {
    if !groups::is_member(&state.db.pool, group_id, auth.user_id).await? {
        return Err(HallError::Forbidden);
    }

    let limit = query.limit.unwrap_or(100).clamp(1, 200);
    let rows = groups::list_group_messages(&state.db.pool, group_id, limit).await?;
    let views = rows
        .into_iter()
        .map(|row| GroupMessageView {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            avatar: row.avatar_url,
            content: row.content,
            created_at: row.created_at,
        })
        .collect();
    Ok(Json(views))
}

#[derive(Deserialize)]
struct SendGroupMessageRequest {
    content: String,
}

/// POST /api/v1/groups/{id}/messages — members only.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
    Json(body): Json<SendGroupMessageRequest>,
) -> HallResult<Json<GroupMessage>> {
    require_text(&body.content, "Message")?;

    if !groups::is_member(&state.db.pool, group_id, auth.user_id).await? {
        return Err(HallError::Forbidden);
    }

    let message =
        groups::insert_group_message(&state.db.pool, group_id, auth.user_id, body.content.trim())
            .await?;
    Ok(Json(message))
}
