//! Profile and study-session routes.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use studyhall_common::{
    models::user::{ProfileResponse, UpdateProfileRequest, UserStats},
    validation::validate_request,
    HallError, HallResult,
};
use studyhall_db::repository::{stats, users};

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users/study-sessions", post(record_study_session))
}

/// GET /api/v1/users/profile
///
/// Aggregated view of the caller's account, profile, and stats rows.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> HallResult<Json<ProfileResponse>> {
    let user = users::find_by_id(&state.db.pool, auth.user_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "User".into(),
        })?;
    let profile = users::get_profile(&state.db.pool, auth.user_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Profile".into(),
        })?;
    let user_stats = users::get_stats(&state.db.pool, auth.user_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Stats".into(),
        })?;

    // Rank is computed live; the stored column is a periodic snapshot.
    let rank = stats::user_rank(&state.db.pool, auth.user_id)
        .await?
        .unwrap_or(user_stats.global_rank as i64);

    Ok(Json(ProfileResponse {
        id: user.id,
        name: profile.name,
        email: user.email,
        avatar: profile.avatar_url,
        bio: profile.bio,
        university: profile.university,
        major: profile.major,
        study_year: profile.study_year,
        total_hours: user_stats.total_study_seconds / 3600,
        current_streak: user_stats.current_streak,
        level_points: user_stats.level_points,
        global_rank: rank as i32,
        badges: profile.badges,
    }))
}

/// PUT /api/v1/users/profile
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<UpdateProfileRequest>,
) -> HallResult<Json<studyhall_common::models::user::UserProfile>> {
    validate_request(&body)?;

    let profile = users::update_profile(
        &state.db.pool,
        auth.user_id,
        body.name.as_deref(),
        body.bio.as_deref(),
        body.avatar.as_deref(),
        body.university.as_deref(),
        body.major.as_deref(),
        body.study_year,
    )
    .await?;

    Ok(Json(profile))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudySessionRequest {
    duration_seconds: i64,
}

/// POST /api/v1/users/study-sessions
///
/// Credit a finished study session: one level point per full minute.
async fn record_study_session(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<StudySessionRequest>,
) -> HallResult<Json<UserStats>> {
    if body.duration_seconds <= 0 || body.duration_seconds > 24 * 3600 {
        return Err(HallError::Validation {
            message: "Session duration must be between 1 second and 24 hours".into(),
        });
    }

    let points = body.duration_seconds / 60;
    stats::add_study_time(&state.db.pool, auth.user_id, body.duration_seconds, points).await?;

    let updated = users::get_stats(&state.db.pool, auth.user_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Stats".into(),
        })?;
    Ok(Json(updated))
}
