//! Signaling router — interprets inbound ops and fans events out.
//!
//! Per-connection state machine: Unauthenticated → Authenticated →
//! (optionally) InRoom → Authenticated (on leave) → Disconnected. The
//! transport handler owns the Unauthenticated step; everything after
//! `Identify` lands here with a [`ConnCtx`].
//!
//! Ordering: delivery within one connection is FIFO (ordered transport,
//! ordered per-connection outbound queue). There is no cross-sender
//! ordering guarantee — two users chatting "at the same time" may be
//! observed in either order by a third.

use crate::SignalingHub;
use crate::registry::ConnHandle;
use chrono::Utc;
use studyhall_common::signal::{ChatRelay, ClientOp, PresenceEntry, ServerEvent, codes};
use std::sync::Arc;
use uuid::Uuid;

/// The room a connection is currently in, with the owner identity
/// captured from the room record at join time (it gates pins).
#[derive(Debug, Clone)]
pub struct JoinedRoom {
    pub room_id: Uuid,
    pub owner_id: Uuid,
}

/// Per-connection state, owned by the transport handler.
pub struct ConnCtx {
    pub handle: ConnHandle,
    pub display_name: String,
    pub display_avatar: Option<String>,
    pub room: Option<JoinedRoom>,
}

impl ConnCtx {
    pub fn new(handle: ConnHandle, display_name: String, display_avatar: Option<String>) -> Self {
        Self {
            handle,
            display_name,
            display_avatar,
            room: None,
        }
    }

    fn user_id(&self) -> Uuid {
        self.handle.user_id
    }

    fn error(&self, code: u32, message: &str) {
        self.handle.send(ServerEvent::Error {
            code,
            message: message.to_string(),
        });
    }
}

impl SignalingHub {
    /// Handle one authenticated inbound op. Errors are delivered to the
    /// originating connection only; nothing here tears the connection
    /// down or touches other rooms.
    pub async fn dispatch(&self, ctx: &mut ConnCtx, op: ClientOp) {
        match op {
            ClientOp::Identify { .. } => {
                ctx.error(codes::BAD_FRAME, "Already identified");
            }
            ClientOp::Join {
                room_id,
                access_code,
            } => self.handle_join(ctx, room_id, access_code).await,
            ClientOp::ChatSend { content } => self.handle_chat(ctx, content).await,
            ClientOp::Pin { message_id } => self.handle_pin(ctx, message_id).await,
            ClientOp::WebRtcSignal { payload, target } => {
                self.handle_signal(ctx, payload, target).await
            }
            ClientOp::Leave => self.handle_leave(ctx).await,
        }
    }

    async fn handle_join(&self, ctx: &mut ConnCtx, room_id: Uuid, access_code: Option<String>) {
        // The room record is the only storage consulted on the join
        // path, and the lookup is bounded so a slow store cannot leave
        // the join hanging.
        let lookup = tokio::time::timeout(
            self.limits.room_lookup_timeout,
            self.directory.room_record(room_id),
        )
        .await;

        let record = match lookup {
            Err(_) => {
                tracing::warn!(room = %room_id, "Room record lookup timed out");
                ctx.error(codes::LOOKUP_FAILED, "Room lookup timed out, try again");
                return;
            }
            Ok(Err(e)) => {
                tracing::warn!(room = %room_id, error = %e, "Room record lookup failed");
                ctx.error(codes::LOOKUP_FAILED, "Room lookup failed, try again");
                return;
            }
            Ok(Ok(None)) => {
                ctx.error(codes::ROOM_NOT_FOUND, "Room not found");
                return;
            }
            Ok(Ok(Some(record))) => record,
        };

        if record.is_private && access_code.as_deref() != record.access_code.as_deref() {
            ctx.error(codes::BAD_ACCESS_CODE, "Invalid access code");
            return;
        }

        // Switching rooms: vacate the old one first.
        if let Some(current) = &ctx.room {
            if current.room_id != room_id {
                self.handle_leave(ctx).await;
            }
        }

        let entry = PresenceEntry {
            user_id: ctx.user_id(),
            connection_id: ctx.handle.connection_id,
            display_name: ctx.display_name.clone(),
            display_avatar: ctx.display_avatar.clone(),
            joined_at: Utc::now(),
        };

        let snapshot = self.presence.join_room(room_id, entry.clone()).await;
        ctx.room = Some(JoinedRoom {
            room_id,
            owner_id: record.owner_id,
        });

        ctx.handle.send(ServerEvent::RoomParticipants {
            room_id,
            participants: snapshot.participants,
            recent_messages: snapshot.recent_messages,
            pinned_message_ids: snapshot.pinned_message_ids,
        });

        self.broadcast(
            room_id,
            ServerEvent::UserJoined {
                entry: entry.clone(),
            },
            Some(ctx.handle.connection_id),
        )
        .await;

        self.mirror_online(room_id, ctx.user_id(), true);

        tracing::info!(
            user = %ctx.user_id(),
            room = %room_id,
            "User joined room"
        );
    }

    async fn handle_chat(&self, ctx: &mut ConnCtx, content: String) {
        let Some(room) = ctx.room.clone() else {
            ctx.error(codes::NOT_IN_ROOM, "Join a room first");
            return;
        };

        let trimmed = content.trim();
        if trimmed.is_empty() {
            ctx.error(codes::BAD_MESSAGE, "Message is empty");
            return;
        }
        if trimmed.len() > self.limits.max_message_length {
            ctx.error(codes::BAD_MESSAGE, "Message too long");
            return;
        }

        let message = ChatRelay {
            id: Uuid::new_v4(),
            room_id: room.room_id,
            user_id: ctx.user_id(),
            display_name: ctx.display_name.clone(),
            content: trimmed.to_string(),
            sent_at: Utc::now(),
        };

        self.presence
            .append_message(room.room_id, message.clone())
            .await;

        // Durable write runs alongside the relay and never gates it; a
        // failed write costs durability, not the live conversation.
        let store = Arc::clone(&self.chat_store);
        let (id, room_id, user_id, text) =
            (message.id, room.room_id, message.user_id, message.content.clone());
        tokio::spawn(async move {
            if let Err(e) = store.persist_message(id, room_id, user_id, &text).await {
                tracing::warn!(room = %room_id, user = %user_id, error = %e, "Chat persistence failed");
            }
        });

        self.broadcast(room.room_id, ServerEvent::NewMessage { message }, None)
            .await;
    }

    async fn handle_pin(&self, ctx: &mut ConnCtx, message_id: Uuid) {
        let Some(room) = ctx.room.clone() else {
            ctx.error(codes::NOT_IN_ROOM, "Join a room first");
            return;
        };

        if room.owner_id != ctx.user_id() {
            ctx.error(codes::NOT_OWNER, "Only the room owner can pin messages");
            return;
        }

        // A pin is a stateful assertion — it must not visually apply
        // unless it was durably recorded.
        match self
            .chat_store
            .persist_pin(room.room_id, message_id, ctx.user_id())
            .await
        {
            Ok(pin_id) => {
                self.presence.add_pin(room.room_id, message_id).await;
                self.broadcast(
                    room.room_id,
                    ServerEvent::MessagePinned {
                        pin_id,
                        message_id,
                        pinned_by: ctx.user_id(),
                    },
                    None,
                )
                .await;
            }
            Err(e) => {
                tracing::warn!(room = %room.room_id, message = %message_id, error = %e, "Pin persistence failed");
                ctx.error(codes::PIN_FAILED, "Could not pin message");
            }
        }
    }

    async fn handle_signal(&self, ctx: &mut ConnCtx, payload: serde_json::Value, target: Uuid) {
        if ctx.room.is_none() {
            ctx.error(codes::NOT_IN_ROOM, "Join a room first");
            return;
        }

        match self.registry.lookup_conn(target).await {
            Some(peer) => {
                peer.send(ServerEvent::WebRtcSignal {
                    payload,
                    from: ctx.handle.connection_id,
                });
            }
            None => {
                // Peer likely disconnected mid-negotiation; a lost race,
                // not an error.
                tracing::debug!(target = %target, "Dropped signal to missing connection");
            }
        }
    }

    async fn handle_leave(&self, ctx: &mut ConnCtx) {
        let Some(room) = ctx.room.take() else {
            return;
        };

        if let Some(outcome) = self
            .presence
            .leave_room(room.room_id, ctx.user_id(), ctx.handle.connection_id)
            .await
        {
            if !outcome.room_closed {
                self.broadcast(
                    room.room_id,
                    ServerEvent::UserLeft {
                        entry: outcome.entry,
                    },
                    None,
                )
                .await;
            }
            self.mirror_online(room.room_id, ctx.user_id(), false);

            tracing::info!(
                user = %ctx.user_id(),
                room = %room.room_id,
                "User left room"
            );
        }
    }

    /// Transport closed — forced leave plus registry cleanup. A normal
    /// lifecycle transition, never surfaced as an error.
    pub async fn handle_disconnect(&self, ctx: &mut ConnCtx) {
        self.handle_leave(ctx).await;
        self.registry
            .unregister(ctx.user_id(), ctx.handle.connection_id)
            .await;
    }

    /// A newer connection registered for this user: vacate the old
    /// connection's room membership and tell the old transport why.
    pub async fn evict_superseded(&self, old: ConnHandle) {
        if let Some(room_id) = self.presence.find_room_of(old.user_id).await {
            if let Some(outcome) = self
                .presence
                .leave_room(room_id, old.user_id, old.connection_id)
                .await
            {
                if !outcome.room_closed {
                    self.broadcast(
                        room_id,
                        ServerEvent::UserLeft {
                            entry: outcome.entry,
                        },
                        None,
                    )
                    .await;
                }
                self.mirror_online(room_id, old.user_id, false);
            }
        }
        old.send(ServerEvent::Error {
            code: codes::SUPERSEDED,
            message: "Session replaced by a newer connection".to_string(),
        });
    }

    /// Fan an event out to a room's members. Delivery is per-target
    /// failure-isolated: a gone or slow member never blocks the rest.
    async fn broadcast(&self, room_id: Uuid, event: ServerEvent, exclude_conn: Option<Uuid>) {
        for entry in self.presence.get_presence(room_id).await {
            if Some(entry.connection_id) == exclude_conn {
                continue;
            }
            match self.registry.lookup_conn(entry.connection_id).await {
                Some(peer) => {
                    if !peer.send(event.clone()) {
                        tracing::debug!(conn = %entry.connection_id, "Missed delivery, writer gone");
                    }
                }
                None => {
                    tracing::debug!(conn = %entry.connection_id, "Presence entry without live connection");
                }
            }
        }
    }

    /// Best-effort mirror of live presence into durable participant
    /// rows; failures are logged and never block the signaling path.
    fn mirror_online(&self, room_id: Uuid, user_id: Uuid, online: bool) {
        let store = Arc::clone(&self.presence_store);
        tokio::spawn(async move {
            if let Err(e) = store.set_online(room_id, user_id, online).await {
                tracing::warn!(room = %room_id, user = %user_id, error = %e, "Presence mirror failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HubLimits;
    use crate::store::{ChatStore, PresenceStore, RoomDirectory};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use studyhall_common::models::room::RoomRecord;
    use studyhall_common::{HallError, HallResult};
    use tokio::sync::mpsc;

    struct FakeDirectory {
        rooms: Vec<RoomRecord>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl RoomDirectory for FakeDirectory {
        async fn room_record(&self, room_id: Uuid) -> HallResult<Option<RoomRecord>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.rooms.iter().find(|r| r.id == room_id).cloned())
        }
    }

    #[derive(Default)]
    struct FakePresenceStore {
        calls: Mutex<Vec<(Uuid, Uuid, bool)>>,
    }

    #[async_trait]
    impl PresenceStore for FakePresenceStore {
        async fn set_online(&self, room_id: Uuid, user_id: Uuid, online: bool) -> HallResult<()> {
            self.calls.lock().unwrap().push((room_id, user_id, online));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeChatStore {
        messages: Mutex<Vec<(Uuid, Uuid, Uuid, String)>>,
        pins: Mutex<Vec<(Uuid, Uuid, Uuid)>>,
        fail_messages: bool,
        fail_pins: bool,
    }

    #[async_trait]
    impl ChatStore for FakeChatStore {
        async fn persist_message(
            &self,
            message_id: Uuid,
            room_id: Uuid,
            user_id: Uuid,
            content: &str,
        ) -> HallResult<()> {
            if self.fail_messages {
                return Err(HallError::Validation {
                    message: "storage down".into(),
                });
            }
            self.messages
                .lock()
                .unwrap()
                .push((message_id, room_id, user_id, content.to_string()));
            Ok(())
        }

        async fn persist_pin(
            &self,
            room_id: Uuid,
            message_id: Uuid,
            pinned_by: Uuid,
        ) -> HallResult<Uuid> {
            if self.fail_pins {
                return Err(HallError::Validation {
                    message: "storage down".into(),
                });
            }
            self.pins
                .lock()
                .unwrap()
                .push((room_id, message_id, pinned_by));
            Ok(Uuid::new_v4())
        }
    }

    struct Harness {
        hub: Arc<SignalingHub>,
        chat: Arc<FakeChatStore>,
        room_id: Uuid,
        owner_id: Uuid,
    }

    fn public_room(owner_id: Uuid) -> RoomRecord {
        RoomRecord {
            id: Uuid::new_v4(),
            owner_id,
            is_private: false,
            access_code: None,
        }
    }

    fn harness_with(record: RoomRecord, chat: FakeChatStore) -> Harness {
        let chat = Arc::new(chat);
        let hub = SignalingHub::new(
            Arc::new(FakeDirectory {
                rooms: vec![record.clone()],
                delay: None,
            }),
            Arc::new(FakePresenceStore::default()),
            chat.clone(),
            HubLimits::default(),
        );
        Harness {
            hub: Arc::new(hub),
            chat,
            room_id: record.id,
            owner_id: record.owner_id,
        }
    }

    fn harness() -> Harness {
        harness_with(public_room(Uuid::new_v4()), FakeChatStore::default())
    }

    async fn connect(
        hub: &SignalingHub,
        user_id: Uuid,
        name: &str,
    ) -> (ConnCtx, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnHandle::new(Uuid::new_v4(), user_id, tx);
        if let Some(old) = hub.registry.register(handle.clone()).await {
            hub.evict_superseded(old).await;
        }
        (ConnCtx::new(handle, name.to_string(), None), rx)
    }

    fn next(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
        rx.try_recv().expect("expected a queued event")
    }

    fn assert_empty(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) {
        assert!(rx.try_recv().is_err(), "expected no further events");
    }

    async fn join(hub: &SignalingHub, ctx: &mut ConnCtx, room_id: Uuid) {
        hub.dispatch(
            ctx,
            ClientOp::Join {
                room_id,
                access_code: None,
            },
        )
        .await;
    }

    #[tokio::test]
    async fn first_joiner_gets_snapshot_of_self() {
        let h = harness();
        let a = Uuid::new_v4();
        let (mut ctx, mut rx) = connect(&h.hub, a, "alice").await;

        join(&h.hub, &mut ctx, h.room_id).await;

        match next(&mut rx) {
            ServerEvent::RoomParticipants { participants, .. } => {
                assert_eq!(participants.len(), 1);
                assert_eq!(participants[0].user_id, a);
            }
            other => panic!("expected RoomParticipants, got {other:?}"),
        }
        assert_empty(&mut rx);
    }

    #[tokio::test]
    async fn second_joiner_notifies_existing_member() {
        let h = harness();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (mut ctx_a, mut rx_a) = connect(&h.hub, a, "alice").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;

        join(&h.hub, &mut ctx_a, h.room_id).await;
        next(&mut rx_a); // own snapshot

        join(&h.hub, &mut ctx_b, h.room_id).await;

        match next(&mut rx_a) {
            ServerEvent::UserJoined { entry } => assert_eq!(entry.user_id, b),
            other => panic!("expected UserJoined, got {other:?}"),
        }
        match next(&mut rx_b) {
            ServerEvent::RoomParticipants { participants, .. } => {
                let ids: Vec<Uuid> = participants.iter().map(|e| e.user_id).collect();
                assert_eq!(ids, vec![a, b]);
            }
            other => panic!("expected RoomParticipants, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn chat_reaches_everyone_and_is_persisted() {
        let h = harness();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (mut ctx_a, mut rx_a) = connect(&h.hub, a, "alice").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;
        join(&h.hub, &mut ctx_a, h.room_id).await;
        join(&h.hub, &mut ctx_b, h.room_id).await;
        next(&mut rx_a);
        next(&mut rx_a);
        next(&mut rx_b);

        h.hub
            .dispatch(
                &mut ctx_a,
                ClientOp::ChatSend {
                    content: "hello".into(),
                },
            )
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let relayed_id = match next(&mut rx_a) {
            ServerEvent::NewMessage { message } => {
                assert_eq!(message.content, "hello");
                assert_eq!(message.user_id, a);
                message.id
            }
            other => panic!("expected NewMessage, got {other:?}"),
        };
        match next(&mut rx_b) {
            ServerEvent::NewMessage { message } => assert_eq!(message.id, relayed_id),
            other => panic!("expected NewMessage, got {other:?}"),
        }

        let stored = h.chat.messages.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, relayed_id);
        assert_eq!(stored[0].3, "hello");
    }

    #[tokio::test]
    async fn chat_relay_survives_persistence_failure() {
        let h = harness_with(
            public_room(Uuid::new_v4()),
            FakeChatStore {
                fail_messages: true,
                ..Default::default()
            },
        );
        let a = Uuid::new_v4();
        let (mut ctx, mut rx) = connect(&h.hub, a, "alice").await;
        join(&h.hub, &mut ctx, h.room_id).await;
        next(&mut rx);

        h.hub
            .dispatch(
                &mut ctx,
                ClientOp::ChatSend {
                    content: "still here".into(),
                },
            )
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(matches!(next(&mut rx), ServerEvent::NewMessage { .. }));
    }

    #[tokio::test]
    async fn empty_chat_is_rejected() {
        let h = harness();
        let (mut ctx, mut rx) = connect(&h.hub, Uuid::new_v4(), "alice").await;
        join(&h.hub, &mut ctx, h.room_id).await;
        next(&mut rx);

        h.hub
            .dispatch(
                &mut ctx,
                ClientOp::ChatSend {
                    content: "   ".into(),
                },
            )
            .await;

        match next(&mut rx) {
            ServerEvent::Error { code, .. } => assert_eq!(code, codes::BAD_MESSAGE),
            other => panic!("expected Error, got {other:?}"),
        }
        assert!(h.chat.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_owner_pin_is_rejected_without_broadcast() {
        let h = harness(); // owner is a third party not connected
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (mut ctx_a, mut rx_a) = connect(&h.hub, a, "alice").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;
        join(&h.hub, &mut ctx_a, h.room_id).await;
        join(&h.hub, &mut ctx_b, h.room_id).await;
        next(&mut rx_a);
        next(&mut rx_a);
        next(&mut rx_b);

        h.hub
            .dispatch(
                &mut ctx_a,
                ClientOp::Pin {
                    message_id: Uuid::new_v4(),
                },
            )
            .await;

        match next(&mut rx_a) {
            ServerEvent::Error { code, .. } => assert_eq!(code, codes::NOT_OWNER),
            other => panic!("expected Error, got {other:?}"),
        }
        assert_empty(&mut rx_b);
        assert!(h.chat.pins.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_pin_broadcasts_to_all_members() {
        let owner = Uuid::new_v4();
        let h = harness_with(public_room(owner), FakeChatStore::default());
        let b = Uuid::new_v4();
        let (mut ctx_o, mut rx_o) = connect(&h.hub, owner, "owner").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;
        join(&h.hub, &mut ctx_o, h.room_id).await;
        join(&h.hub, &mut ctx_b, h.room_id).await;
        next(&mut rx_o);
        next(&mut rx_o);
        next(&mut rx_b);

        let message_id = Uuid::new_v4();
        h.hub
            .dispatch(&mut ctx_o, ClientOp::Pin { message_id })
            .await;

        for rx in [&mut rx_o, &mut rx_b] {
            match next(rx) {
                ServerEvent::MessagePinned {
                    message_id: pinned, ..
                } => assert_eq!(pinned, message_id),
                other => panic!("expected MessagePinned, got {other:?}"),
            }
        }
        assert_eq!(h.owner_id, owner);
    }

    #[tokio::test]
    async fn failed_pin_persistence_suppresses_broadcast() {
        let owner = Uuid::new_v4();
        let h = harness_with(
            public_room(owner),
            FakeChatStore {
                fail_pins: true,
                ..Default::default()
            },
        );
        let (mut ctx, mut rx) = connect(&h.hub, owner, "owner").await;
        join(&h.hub, &mut ctx, h.room_id).await;
        next(&mut rx);

        h.hub
            .dispatch(
                &mut ctx,
                ClientOp::Pin {
                    message_id: Uuid::new_v4(),
                },
            )
            .await;

        match next(&mut rx) {
            ServerEvent::Error { code, .. } => assert_eq!(code, codes::PIN_FAILED),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signal_is_delivered_to_target_only() {
        let h = harness();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (mut ctx_a, mut rx_a) = connect(&h.hub, a, "alice").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;
        let (mut ctx_c, mut rx_c) = connect(&h.hub, c, "carol").await;
        join(&h.hub, &mut ctx_a, h.room_id).await;
        join(&h.hub, &mut ctx_b, h.room_id).await;
        join(&h.hub, &mut ctx_c, h.room_id).await;
        while rx_a.try_recv().is_ok() {}
        while rx_b.try_recv().is_ok() {}
        while rx_c.try_recv().is_ok() {}

        let payload = serde_json::json!({"type": "offer", "sdp": "v=0..."});
        h.hub
            .dispatch(
                &mut ctx_a,
                ClientOp::WebRtcSignal {
                    payload: payload.clone(),
                    target: ctx_b.handle.connection_id,
                },
            )
            .await;

        match next(&mut rx_b) {
            ServerEvent::WebRtcSignal { payload: p, from } => {
                assert_eq!(p, payload);
                assert_eq!(from, ctx_a.handle.connection_id);
            }
            other => panic!("expected WebRtcSignal, got {other:?}"),
        }
        assert_empty(&mut rx_a);
        assert_empty(&mut rx_c);
    }

    #[tokio::test]
    async fn signal_to_missing_target_is_silently_dropped() {
        let h = harness();
        let (mut ctx, mut rx) = connect(&h.hub, Uuid::new_v4(), "alice").await;
        join(&h.hub, &mut ctx, h.room_id).await;
        next(&mut rx);

        h.hub
            .dispatch(
                &mut ctx,
                ClientOp::WebRtcSignal {
                    payload: serde_json::json!({"type": "ice-candidate"}),
                    target: Uuid::new_v4(),
                },
            )
            .await;

        assert_empty(&mut rx);
    }

    #[tokio::test]
    async fn disconnect_prunes_presence_and_notifies() {
        let h = harness();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (mut ctx_a, mut rx_a) = connect(&h.hub, a, "alice").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;
        join(&h.hub, &mut ctx_a, h.room_id).await;
        join(&h.hub, &mut ctx_b, h.room_id).await;
        while rx_a.try_recv().is_ok() {}
        next(&mut rx_b);

        h.hub.handle_disconnect(&mut ctx_a).await;

        match next(&mut rx_b) {
            ServerEvent::UserLeft { entry } => assert_eq!(entry.user_id, a),
            other => panic!("expected UserLeft, got {other:?}"),
        }
        let remaining: Vec<Uuid> = h
            .hub
            .presence
            .get_presence(h.room_id)
            .await
            .iter()
            .map(|e| e.user_id)
            .collect();
        assert_eq!(remaining, vec![b]);

        h.hub.handle_disconnect(&mut ctx_b).await;
        assert!(!h.hub.presence.room_exists(h.room_id).await);
        assert_eq!(h.hub.registry.connected_count().await, 0);
    }

    #[tokio::test]
    async fn wrong_access_code_never_touches_presence() {
        let record = RoomRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            is_private: true,
            access_code: Some("1234".into()),
        };
        let h = harness_with(record, FakeChatStore::default());
        let (mut ctx, mut rx) = connect(&h.hub, Uuid::new_v4(), "alice").await;

        h.hub
            .dispatch(
                &mut ctx,
                ClientOp::Join {
                    room_id: h.room_id,
                    access_code: Some("9999".into()),
                },
            )
            .await;

        match next(&mut rx) {
            ServerEvent::Error { code, .. } => assert_eq!(code, codes::BAD_ACCESS_CODE),
            other => panic!("expected Error, got {other:?}"),
        }
        assert!(ctx.room.is_none());
        assert!(!h.hub.presence.room_exists(h.room_id).await);

        h.hub
            .dispatch(
                &mut ctx,
                ClientOp::Join {
                    room_id: h.room_id,
                    access_code: Some("1234".into()),
                },
            )
            .await;
        assert!(matches!(next(&mut rx), ServerEvent::RoomParticipants { .. }));
    }

    #[tokio::test]
    async fn join_lookup_timeout_rejects_with_transient_error() {
        let hub = SignalingHub::new(
            Arc::new(FakeDirectory {
                rooms: vec![],
                delay: Some(Duration::from_millis(100)),
            }),
            Arc::new(FakePresenceStore::default()),
            Arc::new(FakeChatStore::default()),
            HubLimits {
                room_lookup_timeout: Duration::from_millis(10),
                ..Default::default()
            },
        );
        let (mut ctx, mut rx) = connect(&hub, Uuid::new_v4(), "alice").await;

        hub.dispatch(
            &mut ctx,
            ClientOp::Join {
                room_id: Uuid::new_v4(),
                access_code: None,
            },
        )
        .await;

        match next(&mut rx) {
            ServerEvent::Error { code, .. } => assert_eq!(code, codes::LOOKUP_FAILED),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reconnect_supersedes_and_vacates_old_membership() {
        let h = harness();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (mut ctx_a, mut rx_a_old) = connect(&h.hub, a, "alice").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;
        join(&h.hub, &mut ctx_a, h.room_id).await;
        join(&h.hub, &mut ctx_b, h.room_id).await;
        while rx_a_old.try_recv().is_ok() {}
        next(&mut rx_b);

        // Same user opens a new connection.
        let (ctx_a2, _rx_a_new) = connect(&h.hub, a, "alice").await;

        match next(&mut rx_a_old) {
            ServerEvent::Error { code, .. } => assert_eq!(code, codes::SUPERSEDED),
            other => panic!("expected Error, got {other:?}"),
        }
        match next(&mut rx_b) {
            ServerEvent::UserLeft { entry } => assert_eq!(entry.user_id, a),
            other => panic!("expected UserLeft, got {other:?}"),
        }

        // Only the new connection id routes to alice now.
        assert!(
            h.hub
                .registry
                .lookup_conn(ctx_a.handle.connection_id)
                .await
                .is_none()
        );
        assert!(
            h.hub
                .registry
                .lookup_conn(ctx_a2.handle.connection_id)
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn stale_disconnect_leaves_superseding_session_in_room() {
        let h = harness();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (mut ctx_old, _rx_old) = connect(&h.hub, a, "alice").await;
        let (mut ctx_b, mut rx_b) = connect(&h.hub, b, "bob").await;
        join(&h.hub, &mut ctx_old, h.room_id).await;
        join(&h.hub, &mut ctx_b, h.room_id).await;
        next(&mut rx_b);

        // Alice reconnects (evicting the old session) and rejoins.
        let (mut ctx_new, mut rx_new) = connect(&h.hub, a, "alice").await;
        join(&h.hub, &mut ctx_new, h.room_id).await;
        next(&mut rx_b); // UserLeft from the eviction
        next(&mut rx_b); // UserJoined from the rejoin
        next(&mut rx_new);

        // The replaced transport finally notices its socket is closed.
        // Its ctx still carries the room, but it must not touch the
        // live session's membership.
        h.hub.handle_disconnect(&mut ctx_old).await;

        let present = h.hub.presence.get_presence(h.room_id).await;
        let conns: Vec<Uuid> = present.iter().map(|e| e.connection_id).collect();
        assert!(conns.contains(&ctx_new.handle.connection_id));
        assert_eq!(present.iter().filter(|e| e.user_id == a).count(), 1);
        assert_empty(&mut rx_b);
        assert_empty(&mut rx_new);
        assert!(
            h.hub
                .registry
                .lookup_conn(ctx_new.handle.connection_id)
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn switching_rooms_vacates_the_old_one() {
        let owner = Uuid::new_v4();
        let room_a = public_room(owner);
        let room_b = public_room(owner);
        let chat = Arc::new(FakeChatStore::default());
        let hub = Arc::new(SignalingHub::new(
            Arc::new(FakeDirectory {
                rooms: vec![room_a.clone(), room_b.clone()],
                delay: None,
            }),
            Arc::new(FakePresenceStore::default()),
            chat,
            HubLimits::default(),
        ));
        let (mut ctx, mut rx) = connect(&hub, Uuid::new_v4(), "alice").await;

        join(&hub, &mut ctx, room_a.id).await;
        next(&mut rx);
        join(&hub, &mut ctx, room_b.id).await;

        assert!(!hub.presence.room_exists(room_a.id).await);
        assert_eq!(hub.presence.member_count(room_b.id).await, 1);
        assert_eq!(ctx.room.as_ref().map(|r| r.room_id), Some(room_b.id));
    }
}
