//! # StudyHall Server
//!
//! Main binary that runs both services:
//! - REST API (accounts, rooms, feed, groups, tasks, leaderboard, AI tools)
//! - WebSocket signaling (live room presence, chat relay, WebRTC signaling)
//!
//! Both run in a single process; the REST layer reads live room state
//! through the shared hub handle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use studyhall_api::{ai::AiClient, build_router, AppState};
use studyhall_db::{Cache, Database};
use studyhall_signaling::{store::DbStore, HubLimits, SignalingHub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = studyhall_common::config::init()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studyhall=debug,tower_http=debug".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting StudyHall v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::connect(config).await?;
    db.migrate().await?;

    let cache = Cache::connect(config.redis.url.as_deref()).await;

    // === Signaling hub ===
    // The only shared mutable state: connection registry + room presence.
    // Persistence flows through the DbStore boundary.
    let store = Arc::new(DbStore::new(db.clone()));
    let limits = HubLimits {
        max_message_length: config.limits.max_message_length as usize,
        chat_buffer_size: config.limits.chat_buffer_size,
        room_lookup_timeout: Duration::from_millis(config.limits.room_lookup_timeout_ms),
    };
    let hub = Arc::new(SignalingHub::new(
        store.clone(),
        store.clone(),
        store,
        limits,
    ));

    // === REST API ===
    let api_state = AppState {
        db,
        cache,
        hub: hub.clone(),
        ai: AiClient::new(config.ai.api_key.clone(), config.ai.model.clone()),
    };
    let api_router = build_router(api_state);
    let api_addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    // === Signaling WebSocket ===
    let signaling_router = studyhall_signaling::handler::build_router(hub);
    let signaling_addr = SocketAddr::new(config.server.host.parse()?, config.server.signaling_port);

    tracing::info!("REST API listening on http://{api_addr}");
    tracing::info!("Signaling listening on ws://{signaling_addr}/signaling");

    tokio::try_join!(
        async {
            let listener = tokio::net::TcpListener::bind(api_addr).await?;
            axum::serve(listener, api_router).await?;
            Ok::<_, anyhow::Error>(())
        },
        async {
            let listener = tokio::net::TcpListener::bind(signaling_addr).await?;
            axum::serve(listener, signaling_router).await?;
            Ok::<_, anyhow::Error>(())
        },
    )?;

    Ok(())
}
