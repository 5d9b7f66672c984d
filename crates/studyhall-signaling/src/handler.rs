//! WebSocket transport for the signaling channel.
//!
//! Authentication happens at connection establishment: the first frame
//! must be `Identify` with a valid access token, and anything else gets
//! the connection closed. After that, frames are parsed into [`ClientOp`]
//! and handed to the hub; outbound events flow through the connection's
//! queue so slow sockets never block the router.

use crate::SignalingHub;
use crate::registry::ConnHandle;
use crate::router::ConnCtx;
use studyhall_common::signal::{ClientOp, ServerEvent, codes};
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Build the signaling WebSocket router.
pub fn build_router(hub: Arc<SignalingHub>) -> Router {
    Router::new()
        .route("/signaling", get(ws_handler))
        .with_state(hub)
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<SignalingHub>>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, hub))
}

async fn handle_connection(socket: WebSocket, hub: Arc<SignalingHub>) {
    let (mut sink, mut stream) = socket.split();
    let connection_id = Uuid::new_v4();

    tracing::debug!(conn = %connection_id, "Signaling socket connected");

    // Unauthenticated phase: exactly one frame is acceptable.
    let identity = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                match serde_json::from_str::<ClientOp>(&text) {
                    Ok(ClientOp::Identify { token, avatar_url }) => {
                        match authenticate(&token) {
                            Ok((user_id, display_name)) => {
                                break (user_id, display_name, avatar_url);
                            }
                            Err(message) => {
                                send_direct(
                                    &mut sink,
                                    ServerEvent::Error {
                                        code: codes::BAD_TOKEN,
                                        message,
                                    },
                                )
                                .await;
                                return;
                            }
                        }
                    }
                    Ok(_) => {
                        // Room-scoped ops before identify close the
                        // connection, not just get ignored.
                        send_direct(
                            &mut sink,
                            ServerEvent::Error {
                                code: codes::BAD_FRAME,
                                message: "Identify first".into(),
                            },
                        )
                        .await;
                        return;
                    }
                    Err(e) => {
                        send_direct(
                            &mut sink,
                            ServerEvent::Error {
                                code: codes::BAD_FRAME,
                                message: format!("Invalid frame: {e}"),
                            },
                        )
                        .await;
                        return;
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(_)) => return,
        }
    };
    let (user_id, display_name, avatar_url) = identity;

    // Authenticated: wire up the outbound queue and register.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let handle = ConnHandle::new(connection_id, user_id, tx);
    if let Some(old) = hub.registry.register(handle.clone()).await {
        hub.evict_superseded(old).await;
    }

    let mut ctx = ConnCtx::new(handle, display_name, avatar_url);
    ctx.handle.send(ServerEvent::Ready { connection_id });

    tracing::info!(conn = %connection_id, user = %user_id, "Signaling client identified");

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientOp>(&text) {
                Ok(op) => hub.dispatch(&mut ctx, op).await,
                Err(e) => {
                    ctx.handle.send(ServerEvent::Error {
                        code: codes::BAD_FRAME,
                        message: format!("Invalid frame: {e}"),
                    });
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    hub.handle_disconnect(&mut ctx).await;
    writer.abort();

    tracing::info!(conn = %connection_id, user = %user_id, "Signaling socket disconnected");
}

/// Validate an access token and extract the identity the presence layer
/// snapshots at join time.
fn authenticate(token: &str) -> Result<(Uuid, String), String> {
    let config = studyhall_common::config::get();
    let claims = studyhall_common::auth::validate_token(token, &config.auth.jwt_secret)
        .map_err(|_| "Invalid token".to_string())?;

    if claims.token_type != "access" {
        return Err("Access token required".into());
    }
    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| "Invalid token subject".to_string())?;

    Ok((user_id, claims.name))
}

async fn send_direct(
    sink: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: ServerEvent,
) {
    if let Ok(json) = serde_json::to_string(&event) {
        let _ = sink.send(Message::Text(json.into())).await;
    }
}
