//! Direct-message routes.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use studyhall_common::{
    models::message::{DirectMessage, SendDirectMessageRequest},
    validation::{require_text, validate_request},
    HallError, HallResult,
};
use studyhall_db::repository::{messages, users};
use uuid::Uuid;

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/{user_id}", get(get_conversation))
}

/// POST /api/v1/messages
async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<SendDirectMessageRequest>,
) -> HallResult<Json<DirectMessage>> {
    validate_request(&body)?;
    require_text(&body.content, "Message")?;

    if body.user_id == auth.user_id {
        return Err(HallError::Validation {
            message: "Cannot message yourself".into(),
        });
    }

    users::find_by_id(&state.db.pool, body.user_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "User".into(),
        })?;

    let message = messages::insert_direct_message(
        &state.db.pool,
        auth.user_id,
        body.user_id,
        body.content.trim(),
        &body.r#type,
    )
    .await?;
    Ok(Json(message))
}

#[derive(Deserialize)]
struct ConversationQuery {
    limit: Option<i64>,
}

/// GET /api/v1/messages/{user_id}
///
/// The two-party conversation between the caller and the given user.
async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(other_user): Path<Uuid>,
    Query(query): Query<ConversationQuery>,
) -> HallResult<Json<Vec<DirectMessage>>> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let conversation =
        messages::list_conversation(&state.db.pool, auth.user_id, other_user, limit).await?;
    Ok(Json(conversation))
}
