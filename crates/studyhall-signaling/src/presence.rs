//! Room presence table and room lifecycle.
//!
//! This is the authoritative source of "who is in room X right now",
//! distinct from the durable `room_participants` rows. A room's in-memory
//! state is created lazily by its first joiner and deleted the moment its
//! presence set empties; a later join gets a fresh room with an empty
//! message buffer and no pins carried over.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use studyhall_common::signal::{ChatRelay, PresenceEntry};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Ephemeral per-room state.
#[derive(Debug, Clone)]
struct RoomState {
    /// Insertion-ordered; rejoin replaces in place, keeping position.
    entries: Vec<PresenceEntry>,
    /// Bounded recent-message buffer, oldest evicted.
    recent: VecDeque<ChatRelay>,
    pinned: Vec<Uuid>,
}

impl RoomState {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            recent: VecDeque::new(),
            pinned: Vec::new(),
        }
    }
}

/// Snapshot returned to a joiner.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub participants: Vec<PresenceEntry>,
    pub recent_messages: Vec<ChatRelay>,
    pub pinned_message_ids: Vec<Uuid>,
}

/// Outcome of a leave.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub entry: PresenceEntry,
    /// True when this leave emptied the room and tore it down.
    pub room_closed: bool,
}

/// Presence across all live rooms.
#[derive(Clone)]
pub struct PresenceTable {
    rooms: Arc<RwLock<HashMap<Uuid, RoomState>>>,
    buffer_size: usize,
}

impl PresenceTable {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            buffer_size,
        }
    }

    /// Add a user to a room, creating the room if absent. Rejoin with the
    /// same identity replaces the prior entry rather than duplicating it.
    /// Returns the post-join snapshot.
    pub async fn join_room(&self, room_id: Uuid, entry: PresenceEntry) -> RoomSnapshot {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id).or_insert_with(RoomState::new);

        match room.entries.iter_mut().find(|e| e.user_id == entry.user_id) {
            Some(existing) => *existing = entry,
            None => room.entries.push(entry),
        }

        RoomSnapshot {
            participants: room.entries.clone(),
            recent_messages: room.recent.iter().cloned().collect(),
            pinned_message_ids: room.pinned.clone(),
        }
    }

    /// Remove a user from a room; tears the room down when it empties.
    /// Removal is keyed by user *and* connection id: a replaced
    /// connection's late leave must not evict the entry a superseding
    /// session rejoined with. Leaving a room you are not in (or with a
    /// stale connection id) is a no-op returning `None`.
    pub async fn leave_room(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        connection_id: Uuid,
    ) -> Option<LeaveOutcome> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(&room_id)?;

        let idx = room
            .entries
            .iter()
            .position(|e| e.user_id == user_id && e.connection_id == connection_id)?;
        let entry = room.entries.remove(idx);

        let room_closed = room.entries.is_empty();
        if room_closed {
            rooms.remove(&room_id);
            tracing::debug!(room = %room_id, "Room emptied, state discarded");
        }

        Some(LeaveOutcome { entry, room_closed })
    }

    /// Insertion-ordered presence for a room; empty if the room is gone.
    pub async fn get_presence(&self, room_id: Uuid) -> Vec<PresenceEntry> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map(|r| r.entries.clone())
            .unwrap_or_default()
    }

    /// Which room (if any) a user is currently present in. Used when a
    /// superseding connection has to evict its predecessor.
    pub async fn find_room_of(&self, user_id: Uuid) -> Option<Uuid> {
        self.rooms
            .read()
            .await
            .iter()
            .find(|(_, room)| room.entries.iter().any(|e| e.user_id == user_id))
            .map(|(id, _)| *id)
    }

    /// Append a relay copy to the room's bounded buffer.
    pub async fn append_message(&self, room_id: Uuid, message: ChatRelay) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(&room_id) {
            if room.recent.len() >= self.buffer_size {
                room.recent.pop_front();
            }
            room.recent.push_back(message);
        }
    }

    /// Record a pin on the room's ephemeral state.
    pub async fn add_pin(&self, room_id: Uuid, message_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(&room_id) {
            if !room.pinned.contains(&message_id) {
                room.pinned.push(message_id);
            }
        }
    }

    pub async fn room_exists(&self, room_id: Uuid) -> bool {
        self.rooms.read().await.contains_key(&room_id)
    }

    pub async fn active_room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Live member count for a room, for REST listings and health stats.
    pub async fn member_count(&self, room_id: Uuid) -> usize {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map(|r| r.entries.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(user_id: Uuid, name: &str) -> PresenceEntry {
        PresenceEntry {
            user_id,
            connection_id: Uuid::new_v4(),
            display_name: name.to_string(),
            display_avatar: None,
            joined_at: Utc::now(),
        }
    }

    fn relay(room_id: Uuid, content: &str) -> ChatRelay {
        ChatRelay {
            id: Uuid::new_v4(),
            room_id,
            user_id: Uuid::new_v4(),
            display_name: "tester".into(),
            content: content.into(),
            sent_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn membership_matches_join_leave_history() {
        let table = PresenceTable::new(50);
        let room = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        table.join_room(room, entry(a, "a")).await;
        let e_b = entry(b, "b");
        table.join_room(room, e_b.clone()).await;
        table.join_room(room, entry(c, "c")).await;
        table.leave_room(room, b, e_b.connection_id).await;

        let present: Vec<Uuid> = table
            .get_presence(room)
            .await
            .iter()
            .map(|e| e.user_id)
            .collect();
        assert_eq!(present, vec![a, c]);
    }

    #[tokio::test]
    async fn rejoin_replaces_without_duplicating() {
        let table = PresenceTable::new(50);
        let room = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        table.join_room(room, entry(a, "a")).await;
        table.join_room(room, entry(b, "b")).await;
        let snapshot = table.join_room(room, entry(a, "a-again")).await;

        assert_eq!(snapshot.participants.len(), 2);
        // Replacement keeps the original slot, so ordering is stable.
        assert_eq!(snapshot.participants[0].user_id, a);
        assert_eq!(snapshot.participants[0].display_name, "a-again");
    }

    #[tokio::test]
    async fn double_leave_is_idempotent() {
        let table = PresenceTable::new(50);
        let room = Uuid::new_v4();
        let a = Uuid::new_v4();

        let e_a = entry(a, "a");
        table.join_room(room, e_a.clone()).await;
        let first = table.leave_room(room, a, e_a.connection_id).await;
        assert!(first.is_some_and(|o| o.room_closed));
        assert!(table.leave_room(room, a, e_a.connection_id).await.is_none());
    }

    #[tokio::test]
    async fn leave_with_stale_connection_id_is_a_no_op() {
        let table = PresenceTable::new(50);
        let room = Uuid::new_v4();
        let a = Uuid::new_v4();

        let old = entry(a, "a");
        table.join_room(room, old.clone()).await;
        // Same user rejoins on a fresh connection; the entry is replaced.
        let new = entry(a, "a");
        table.join_room(room, new.clone()).await;

        assert!(table.leave_room(room, a, old.connection_id).await.is_none());
        let present = table.get_presence(room).await;
        assert_eq!(present.len(), 1);
        assert_eq!(present[0].connection_id, new.connection_id);

        assert!(table.leave_room(room, a, new.connection_id).await.is_some());
        assert!(!table.room_exists(room).await);
    }

    #[tokio::test]
    async fn teardown_discards_buffer_and_pins() {
        let table = PresenceTable::new(50);
        let room = Uuid::new_v4();
        let a = Uuid::new_v4();

        let e_a = entry(a, "a");
        table.join_room(room, e_a.clone()).await;
        table.append_message(room, relay(room, "hello")).await;
        table.add_pin(room, Uuid::new_v4()).await;
        table.leave_room(room, a, e_a.connection_id).await;
        assert!(!table.room_exists(room).await);

        // A fresh incarnation starts clean.
        let snapshot = table.join_room(room, entry(a, "a")).await;
        assert!(snapshot.recent_messages.is_empty());
        assert!(snapshot.pinned_message_ids.is_empty());
    }

    #[tokio::test]
    async fn message_buffer_is_bounded() {
        let table = PresenceTable::new(3);
        let room = Uuid::new_v4();
        table.join_room(room, entry(Uuid::new_v4(), "a")).await;

        for i in 0..5 {
            table.append_message(room, relay(room, &format!("m{i}"))).await;
        }

        let snapshot = table.join_room(room, entry(Uuid::new_v4(), "b")).await;
        let contents: Vec<&str> = snapshot
            .recent_messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn find_room_of_tracks_single_membership() {
        let table = PresenceTable::new(50);
        let room = Uuid::new_v4();
        let a = Uuid::new_v4();

        assert!(table.find_room_of(a).await.is_none());
        table.join_room(room, entry(a, "a")).await;
        assert_eq!(table.find_room_of(a).await, Some(room));
    }
}
