//! Client-side error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    Closed,

    #[error("media engine error: {0}")]
    Media(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
