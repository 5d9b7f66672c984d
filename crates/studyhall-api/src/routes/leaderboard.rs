//! Leaderboard route — top users by level points plus the caller's rank.

use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use studyhall_common::HallResult;
use studyhall_db::repository::stats;
use uuid::Uuid;

use crate::{middleware::AuthContext, AppState};

const LEADERBOARD_SIZE: i64 = 50;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/leaderboard", get(get_leaderboard))
        .route("/leaderboard/rank", get(get_rank))
}

#[derive(Serialize)]
struct LeaderboardEntry {
    rank: usize,
    user_id: Uuid,
    name: String,
    avatar: Option<String>,
    level_points: i64,
    total_hours: i64,
    current_streak: i32,
}

#[derive(Serialize)]
struct LeaderboardResponse {
    entries: Vec<LeaderboardEntry>,
    my_rank: Option<i64>,
}

/// GET /api/v1/leaderboard
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> HallResult<Json<LeaderboardResponse>> {
    let rows = stats::leaderboard(&state.db.pool, LEADERBOARD_SIZE).await?;
    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i + 1,
            user_id: row.user_id,
            name: row.name,
            avatar: row.avatar_url,
            level_points: row.level_points,
            total_hours: row.total_study_seconds / 3600,
            current_streak: row.current_streak,
        })
        .collect();

    let my_rank = stats::user_rank(&state.db.pool, auth.user_id).await?;

    Ok(Json(LeaderboardResponse { entries, my_rank }))
}

#[derive(Serialize)]
struct RankResponse {
    rank: Option<i64>,
}

/// GET /api/v1/leaderboard/rank — just the caller's rank.
async fn get_rank(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> HallResult<Json<RankResponse>> {
    let rank = stats::user_rank(&state.db.pool, auth.user_id).await?;
    Ok(Json(RankResponse { rank }))
}
