//! Wire contract for the signaling channel, shared by the server and the
//! client SDK.
//!
//! Every frame is a JSON object with an `op` discriminant and a
//! type-specific `d` payload. Clients send [`ClientOp`], the server sends
//! [`ServerEvent`]. WebRTC payloads (SDP, ICE candidates) are relayed as
//! opaque JSON — the server routes them by target connection id and never
//! inspects their contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user's membership in one room. Display fields are a snapshot
/// taken at join time, never live-updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub user_id: Uuid,
    pub connection_id: Uuid,
    pub display_name: String,
    pub display_avatar: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// Transient chat relay copy. The durable record is written separately
/// and shares this id; the two paths are not transactionally linked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRelay {
    pub id: Uuid,
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Client → server operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientOp {
    /// Authenticate with a JWT access token. Must be the first frame on
    /// the connection; anything else gets the connection closed.
    Identify {
        token: String,
        /// Display avatar for presence snapshots, captured at identify
        /// time alongside the verified display name from the token.
        avatar_url: Option<String>,
    },

    /// Join a study room. Switches rooms if already in one.
    Join {
        room_id: Uuid,
        access_code: Option<String>,
    },

    /// Send a chat message to the current room.
    ChatSend { content: String },

    /// Pin a message in the current room (owner only).
    Pin { message_id: Uuid },

    /// Relay a WebRTC negotiation payload to one peer's connection.
    WebRtcSignal {
        payload: serde_json::Value,
        target: Uuid,
    },

    /// Leave the current room without disconnecting.
    Leave,
}

/// Server → client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ServerEvent {
    /// Authentication succeeded; here is your connection id. Peers
    /// address WebRTC signals to this id.
    Ready { connection_id: Uuid },

    /// Full room snapshot, sent to the joiner only.
    RoomParticipants {
        room_id: Uuid,
        participants: Vec<PresenceEntry>,
        recent_messages: Vec<ChatRelay>,
        pinned_message_ids: Vec<Uuid>,
    },

    /// A user joined the room.
    UserJoined { entry: PresenceEntry },

    /// A user left the room (explicit leave or disconnect).
    UserLeft { entry: PresenceEntry },

    /// Chat message relayed to all room members, sender included.
    NewMessage { message: ChatRelay },

    /// A message was pinned (already durably recorded).
    MessagePinned {
        pin_id: Uuid,
        message_id: Uuid,
        pinned_by: Uuid,
    },

    /// WebRTC payload relayed from another peer.
    WebRtcSignal {
        payload: serde_json::Value,
        from: Uuid,
    },

    /// Error scoped to this connection; the connection stays usable.
    Error { code: u32, message: String },
}

/// Error codes on the signaling channel.
pub mod codes {
    /// Malformed or out-of-place frame.
    pub const BAD_FRAME: u32 = 4000;
    /// Token validation failed at identify.
    pub const BAD_TOKEN: u32 = 4001;
    /// Operation requires being in a room.
    pub const NOT_IN_ROOM: u32 = 4003;
    /// Token valid but identify refused (bad subject).
    pub const BAD_IDENTITY: u32 = 4004;
    /// Private room access code missing or wrong.
    pub const BAD_ACCESS_CODE: u32 = 4005;
    /// A newer connection for this user replaced this one.
    pub const SUPERSEDED: u32 = 4006;
    /// Pin attempted by someone other than the room owner.
    pub const NOT_OWNER: u32 = 4007;
    /// Empty or oversized chat message.
    pub const BAD_MESSAGE: u32 = 4008;
    /// Room record not found at join.
    pub const ROOM_NOT_FOUND: u32 = 4040;
    /// Room directory lookup failed or timed out; retryable.
    pub const LOOKUP_FAILED: u32 = 5001;
    /// Pin could not be durably recorded; not applied.
    pub const PIN_FAILED: u32 = 5002;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_round_trip_through_op_d_shape() {
        let op = ClientOp::Join {
            room_id: Uuid::new_v4(),
            access_code: Some("1234".into()),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "Join");
        assert!(json["d"]["room_id"].is_string());

        let back: ClientOp = serde_json::from_value(json).unwrap();
        assert!(matches!(back, ClientOp::Join { .. }));
    }

    #[test]
    fn relay_payload_stays_opaque() {
        let payload = serde_json::json!({"type": "offer", "sdp": "v=0\r\no=- 0 0"});
        let event = ServerEvent::WebRtcSignal {
            payload: payload.clone(),
            from: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        match back {
            ServerEvent::WebRtcSignal { payload: p, .. } => assert_eq!(p, payload),
            other => panic!("expected WebRtcSignal, got {other:?}"),
        }
    }
}
