//! Health check endpoint — for load balancers, monitoring, and Docker health checks.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use studyhall_db::repository::{rooms, users};
use studyhall_signaling::HubStats;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    users: i64,
    rooms: i64,
    signaling: HubStats,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    // A failing count means the database is unreachable.
    let user_count = users::count_users(&state.db.pool).await;
    let room_count = rooms::count_rooms(&state.db.pool).await;
    let db_ok = user_count.is_ok() && room_count.is_ok();

    Json(HealthResponse {
        status: if db_ok {
            "healthy".into()
        } else {
            "degraded".into()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        users: user_count.unwrap_or(-1),
        rooms: room_count.unwrap_or(-1),
        signaling: state.hub.stats().await,
    })
}
