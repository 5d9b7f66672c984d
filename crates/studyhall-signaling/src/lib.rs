//! # studyhall-signaling
//!
//! Real-time room coordination and WebRTC signaling server.
//!
//! Flow for a typical session:
//!
//! 1. Client connects to /signaling
//! 2. Sends `Identify` with a JWT access token (first frame, mandatory)
//! 3. Sends `Join` with a room id (+ access code for private rooms)
//! 4. Server admits, sends the room snapshot, broadcasts `UserJoined`
//! 5. Members negotiate pairwise WebRTC links by relaying opaque
//!    `WebRtcSignal` payloads addressed by connection id
//! 6. Chat and pin events flow through the same channel
//! 7. `Leave` or disconnect prunes presence; empty rooms are torn down
//!
//! The hub owns the only shared mutable state (connection registry and
//! presence table) and is constructed at startup and injected — the REST
//! layer reads live stats through it but never mutates it.

pub mod handler;
pub mod presence;
pub mod registry;
pub mod router;
pub mod store;

use crate::presence::PresenceTable;
use crate::registry::ConnectionRegistry;
use crate::store::{ChatStore, PresenceStore, RoomDirectory};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Tunables the hub needs; lifted out of the global config so tests can
/// construct hubs directly.
#[derive(Debug, Clone)]
pub struct HubLimits {
    pub max_message_length: usize,
    pub chat_buffer_size: usize,
    /// Bound on the room-record lookup at join time; past this the join
    /// is rejected with a retryable error instead of hanging.
    pub room_lookup_timeout: Duration,
}

impl Default for HubLimits {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            chat_buffer_size: 50,
            room_lookup_timeout: Duration::from_secs(3),
        }
    }
}

/// Shared signaling state — one per process.
pub struct SignalingHub {
    pub registry: ConnectionRegistry,
    pub presence: PresenceTable,
    pub(crate) directory: Arc<dyn RoomDirectory>,
    pub(crate) presence_store: Arc<dyn PresenceStore>,
    pub(crate) chat_store: Arc<dyn ChatStore>,
    pub(crate) limits: HubLimits,
}

impl SignalingHub {
    pub fn new(
        directory: Arc<dyn RoomDirectory>,
        presence_store: Arc<dyn PresenceStore>,
        chat_store: Arc<dyn ChatStore>,
        limits: HubLimits,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            presence: PresenceTable::new(limits.chat_buffer_size),
            directory,
            presence_store,
            chat_store,
            limits,
        }
    }

    /// Live member count for a room (0 when the room has no live state).
    pub async fn active_users_in(&self, room_id: Uuid) -> usize {
        self.presence.member_count(room_id).await
    }

    pub async fn stats(&self) -> HubStats {
        HubStats {
            active_rooms: self.presence.active_room_count().await,
            connected_users: self.registry.connected_count().await,
        }
    }
}

/// Live signaling stats for the health endpoint.
#[derive(Debug, serde::Serialize)]
pub struct HubStats {
    pub active_rooms: usize,
    pub connected_users: usize,
}
