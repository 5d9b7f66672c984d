//! Async WebSocket signaling client.
//!
//! Maintains the connection in a background task with auto-reconnect and
//! exponential backoff; consumers subscribe to a broadcast of
//! [`ClientEvent`]s and push ops through the returned handle. After a
//! reconnect, subscribers see `Reconnecting` then a fresh `Connected` —
//! that is the cue to tear down peer sessions and rejoin.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use studyhall_common::signal::{ClientOp, ServerEvent};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{ClientError, Result};

const DEFAULT_URL: &str = "ws://localhost:3002/signaling";

/// Events surfaced to subscribers, wrapping the wire events with
/// connection lifecycle notices.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Identified on a (re)established connection.
    Connected { connection_id: Uuid },
    /// A server event arrived.
    Event(ServerEvent),
    /// Connection lost; a reconnect attempt is scheduled.
    Reconnecting { attempt: u32 },
    /// Gave up reconnecting.
    Closed,
}

/// Async signaling client.
///
/// ```rust,no_run
/// use studyhall_client::signaling::SignalingClient;
///
/// #[tokio::main]
/// async fn main() -> studyhall_client::Result<()> {
///     let client = SignalingClient::new("my-access-token", None);
///     let mut events = client.subscribe();
///     client.connect().await?; // spawns background task
///     while let Ok(event) = events.recv().await {
///         println!("{event:?}");
///     }
///     Ok(())
/// }
/// ```
pub struct SignalingClient {
    token: String,
    avatar_url: Option<String>,
    url: String,
    max_reconnect: u32,
    events: broadcast::Sender<ClientEvent>,
    ops_tx: mpsc::UnboundedSender<ClientOp>,
    ops_rx: Arc<Mutex<mpsc::UnboundedReceiver<ClientOp>>>,
}

impl SignalingClient {
    pub fn new(token: impl Into<String>, url: Option<&str>) -> Self {
        let (events, _) = broadcast::channel(256);
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        Self {
            token: token.into(),
            avatar_url: None,
            url: url.unwrap_or(DEFAULT_URL).to_owned(),
            max_reconnect: 10,
            events,
            ops_tx,
            ops_rx: Arc::new(Mutex::new(ops_rx)),
        }
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    /// Subscribe to connection and server events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Queue an op for the server. Ops queued while reconnecting are
    /// delivered once the connection is back.
    pub fn send(&self, op: ClientOp) -> Result<()> {
        self.ops_tx.send(op).map_err(|_| ClientError::Closed)
    }

    pub fn join(&self, room_id: Uuid, access_code: Option<String>) -> Result<()> {
        self.send(ClientOp::Join {
            room_id,
            access_code,
        })
    }

    pub fn chat(&self, content: impl Into<String>) -> Result<()> {
        self.send(ClientOp::ChatSend {
            content: content.into(),
        })
    }

    pub fn pin(&self, message_id: Uuid) -> Result<()> {
        self.send(ClientOp::Pin { message_id })
    }

    /// Relay an opaque WebRTC payload to a peer's connection id.
    pub fn signal(&self, target: Uuid, payload: serde_json::Value) -> Result<()> {
        self.send(ClientOp::WebRtcSignal { payload, target })
    }

    pub fn leave(&self) -> Result<()> {
        self.send(ClientOp::Leave)
    }

    /// Spawns the background connection task and returns immediately;
    /// use [`subscribe`](Self::subscribe) to observe events.
    pub async fn connect(&self) -> Result<()> {
        let token = self.token.clone();
        let avatar_url = self.avatar_url.clone();
        let url = self.url.clone();
        let max_reconnect = self.max_reconnect;
        let events = self.events.clone();
        let ops_rx = Arc::clone(&self.ops_rx);

        tokio::spawn(async move {
            let mut attempts = 0u32;
            loop {
                match run_once(&token, avatar_url.as_deref(), &url, &events, &ops_rx).await {
                    Ok(()) => break, // clean close requested by server
                    Err(e) => {
                        attempts += 1;
                        if attempts > max_reconnect {
                            error!("Signaling: max reconnect attempts reached: {e}");
                            let _ = events.send(ClientEvent::Closed);
                            break;
                        }
                        let delay = Duration::from_secs(u64::min(2u64.pow(attempts), 30));
                        warn!(
                            "Signaling: disconnected ({e}), reconnecting in {delay:?} (attempt {attempts})"
                        );
                        let _ = events.send(ClientEvent::Reconnecting { attempt: attempts });
                        sleep(delay).await;
                    }
                }
            }
        });

        Ok(())
    }
}

async fn run_once(
    token: &str,
    avatar_url: Option<&str>,
    url: &str,
    events: &broadcast::Sender<ClientEvent>,
    ops_rx: &Mutex<mpsc::UnboundedReceiver<ClientOp>>,
) -> Result<()> {
    let (ws, _) = connect_async(url).await?;
    let (mut sink, mut stream) = ws.split();

    let identify = ClientOp::Identify {
        token: token.to_owned(),
        avatar_url: avatar_url.map(str::to_owned),
    };
    sink.send(Message::Text(serde_json::to_string(&identify)?.into()))
        .await?;

    let mut ops = ops_rx.lock().await;
    loop {
        tokio::select! {
            op = ops.recv() => {
                let Some(op) = op else { return Ok(()) };
                sink.send(Message::Text(serde_json::to_string(&op)?.into())).await?;
            }
            msg = stream.next() => {
                let Some(msg) = msg else { return Err(ClientError::Closed) };
                let text = match msg? {
                    Message::Text(t) => t,
                    Message::Close(_) => return Err(ClientError::Closed),
                    _ => continue,
                };
                match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(ServerEvent::Ready { connection_id }) => {
                        debug!(conn = %connection_id, "Signaling client ready");
                        let _ = events.send(ClientEvent::Connected { connection_id });
                    }
                    Ok(event) => {
                        let _ = events.send(ClientEvent::Event(event));
                    }
                    Err(e) => warn!("Signaling: unparseable frame: {e}"),
                }
            }
        }
    }
}
