//! # studyhall-api
//!
//! REST API layer for StudyHall: accounts, profiles, study and focus
//! rooms, the social feed, groups, tasks, leaderboard, direct messages,
//! and AI study tools. Live room data (presence counts, health stats) is
//! read through the signaling hub handle; the REST layer never mutates
//! signaling state.

pub mod ai;
pub mod auth;
pub mod middleware;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use studyhall_db::{Cache, Database};
use studyhall_signaling::SignalingHub;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Redis-or-memory cache for hot list responses.
    pub cache: Cache,
    /// Read-only handle onto live signaling state.
    pub hub: Arc<SignalingHub>,
    /// Text-generation client for the AI study tools.
    pub ai: ai::AiClient,
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .merge(routes::auth::router())
        .merge(routes::health::router());

    let protected = Router::new()
        .merge(routes::users::router())
        .merge(routes::rooms::router())
        .merge(routes::social::router())
        .merge(routes::groups::router())
        .merge(routes::tasks::router())
        .merge(routes::leaderboard::router())
        .merge(routes::messages::router())
        .merge(routes::ai::router())
        .layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .nest("/api/v1", public.merge(protected))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
