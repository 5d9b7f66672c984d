//! Peer negotiation driver.
//!
//! Establishes one media session per other room participant, using the
//! signaling channel purely as a blind relay. Sessions are keyed by the
//! *remote connection id*, not user identity: a peer that reconnects
//! comes back with a fresh connection id and is negotiated from scratch,
//! with the stale session torn down by its `UserLeft` event.
//!
//! The actual media machinery (SDP production, candidate gathering,
//! transport) lives behind [`MediaSession`] — a browser's WebRTC stack or
//! an embedder's native engine. This module owns what the media stack
//! does not: session lifecycle, initiator/answerer roles, and applying
//! trickle-ICE candidates in a safe order. Candidates that arrive before
//! a session has its remote description are queued and flushed once it
//! does, instead of being dropped on the floor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{hash_map::Entry, HashMap};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;

/// Candidates queued for a peer we have not negotiated with yet. Keeps a
/// misbehaving or long-gone peer from growing the queue without bound.
const MAX_QUEUED_CANDIDATES: usize = 64;

/// Shape of the opaque payload relayed through `WebRtcSignal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalPayload {
    Offer { description: serde_json::Value },
    Answer { description: serde_json::Value },
    IceCandidate { candidate: serde_json::Value },
}

/// One media session with one remote peer. Implemented by the embedder
/// over its WebRTC stack.
#[async_trait]
pub trait MediaSession: Send {
    /// Produce a local offer description.
    async fn create_offer(&mut self) -> Result<serde_json::Value>;

    /// Apply a remote offer and produce the answer description.
    async fn accept_offer(&mut self, offer: serde_json::Value) -> Result<serde_json::Value>;

    /// Apply the remote answer to a previously created offer.
    async fn accept_answer(&mut self, answer: serde_json::Value) -> Result<()>;

    /// Feed one remote ICE candidate. Only called once the session has a
    /// remote description.
    async fn add_remote_candidate(&mut self, candidate: serde_json::Value) -> Result<()>;

    /// Release resources. Called on peer departure and on reconnect.
    async fn close(&mut self);
}

/// Factory for media sessions.
pub trait MediaEngine: Send + Sync {
    fn new_session(&self) -> Box<dyn MediaSession>;
}

struct PeerSession {
    media: Box<dyn MediaSession>,
    has_remote_description: bool,
    queued_candidates: Vec<serde_json::Value>,
}

/// Drives pairwise negotiation for all peers in the current room.
///
/// The embedder feeds it the room events from the signaling client
/// (`UserJoined`, `UserLeft`, `WebRtcSignal`) and forwards the
/// `(target, payload)` pairs it emits back through
/// `SignalingClient::signal`.
pub struct PeerManager {
    engine: Box<dyn MediaEngine>,
    sessions: HashMap<Uuid, PeerSession>,
    early_candidates: HashMap<Uuid, Vec<serde_json::Value>>,
    signal_tx: mpsc::UnboundedSender<(Uuid, serde_json::Value)>,
}

impl PeerManager {
    pub fn new(
        engine: Box<dyn MediaEngine>,
        signal_tx: mpsc::UnboundedSender<(Uuid, serde_json::Value)>,
    ) -> Self {
        Self {
            engine,
            sessions: HashMap::new(),
            early_candidates: HashMap::new(),
            signal_tx,
        }
    }

    /// A new participant appeared: existing members initiate, so create
    /// a session and send them our offer.
    pub async fn handle_user_joined(&mut self, connection_id: Uuid) -> Result<()> {
        if self.sessions.contains_key(&connection_id) {
            // Rejoin under the same connection id; nothing to renegotiate.
            return Ok(());
        }

        let mut media = self.engine.new_session();
        let description = media.create_offer().await?;
        self.sessions.insert(
            connection_id,
            PeerSession {
                media,
                has_remote_description: false,
                queued_candidates: self
                    .early_candidates
                    .remove(&connection_id)
                    .unwrap_or_default(),
            },
        );

        self.emit(connection_id, &SignalPayload::Offer { description });
        tracing::debug!(peer = %connection_id, "Sent offer to new peer");
        Ok(())
    }

    /// A relayed payload arrived from `from`.
    pub async fn handle_signal(&mut self, from: Uuid, payload: serde_json::Value) -> Result<()> {
        let payload = match serde_json::from_value::<SignalPayload>(payload) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(peer = %from, error = %e, "Unparseable signal payload");
                return Ok(());
            }
        };

        match payload {
            SignalPayload::Offer { description } => {
                // Answerer path: create the session on demand. An offer
                // on an existing session is a renegotiation.
                let session = match self.sessions.entry(from) {
                    Entry::Occupied(existing) => existing.into_mut(),
                    Entry::Vacant(slot) => slot.insert(PeerSession {
                        media: self.engine.new_session(),
                        has_remote_description: false,
                        queued_candidates: self
                            .early_candidates
                            .remove(&from)
                            .unwrap_or_default(),
                    }),
                };
                let answer = session.media.accept_offer(description).await?;
                session.has_remote_description = true;

                self.emit(from, &SignalPayload::Answer {
                    description: answer,
                });
                self.flush_candidates(from).await?;
            }

            SignalPayload::Answer { description } => {
                let Some(session) = self.sessions.get_mut(&from) else {
                    tracing::debug!(peer = %from, "Answer for unknown session, dropped");
                    return Ok(());
                };
                session.media.accept_answer(description).await?;
                session.has_remote_description = true;
                self.flush_candidates(from).await?;
            }

            SignalPayload::IceCandidate { candidate } => {
                match self.sessions.get_mut(&from) {
                    Some(session) if session.has_remote_description => {
                        session.media.add_remote_candidate(candidate).await?;
                    }
                    Some(session) => {
                        // Trickle race: candidate beat the answer/offer.
                        if session.queued_candidates.len() < MAX_QUEUED_CANDIDATES {
                            session.queued_candidates.push(candidate);
                        }
                    }
                    None => {
                        // Candidate beat the offer itself.
                        let queue = self.early_candidates.entry(from).or_default();
                        if queue.len() < MAX_QUEUED_CANDIDATES {
                            queue.push(candidate);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Forward a locally gathered candidate to a peer.
    pub fn send_local_candidate(&self, target: Uuid, candidate: serde_json::Value) {
        self.emit(target, &SignalPayload::IceCandidate { candidate });
    }

    /// The peer left (or its old connection was superseded): tear the
    /// session down and forget anything queued for it.
    pub async fn handle_user_left(&mut self, connection_id: Uuid) {
        self.early_candidates.remove(&connection_id);
        if let Some(mut session) = self.sessions.remove(&connection_id) {
            session.media.close().await;
            tracing::debug!(peer = %connection_id, "Peer session torn down");
        }
    }

    /// Our own connection was replaced (reconnect): every peer will see
    /// us under a new connection id, so all sessions start over.
    pub async fn reset(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.media.close().await;
        }
        self.early_candidates.clear();
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    async fn flush_candidates(&mut self, peer: Uuid) -> Result<()> {
        let Some(session) = self.sessions.get_mut(&peer) else {
            return Ok(());
        };
        for candidate in std::mem::take(&mut session.queued_candidates) {
            session.media.add_remote_candidate(candidate).await?;
        }
        Ok(())
    }

    fn emit(&self, target: Uuid, payload: &SignalPayload) {
        if let Ok(value) = serde_json::to_value(payload) {
            let _ = self.signal_tx.send((target, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateOffer,
        AcceptOffer(serde_json::Value),
        AcceptAnswer(serde_json::Value),
        Candidate(serde_json::Value),
        Close,
    }

    #[derive(Clone, Default)]
    struct CallLog(Arc<Mutex<Vec<Call>>>);

    impl CallLog {
        fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeSession {
        log: CallLog,
    }

    #[async_trait]
    impl MediaSession for FakeSession {
        async fn create_offer(&mut self) -> Result<serde_json::Value> {
            self.record(Call::CreateOffer);
            Ok(serde_json::json!({"sdp": "offer"}))
        }

        async fn accept_offer(&mut self, offer: serde_json::Value) -> Result<serde_json::Value> {
            self.record(Call::AcceptOffer(offer));
            Ok(serde_json::json!({"sdp": "answer"}))
        }

        async fn accept_answer(&mut self, answer: serde_json::Value) -> Result<()> {
            self.record(Call::AcceptAnswer(answer));
            Ok(())
        }

        async fn add_remote_candidate(&mut self, candidate: serde_json::Value) -> Result<()> {
            self.record(Call::Candidate(candidate));
            Ok(())
        }

        async fn close(&mut self) {
            self.record(Call::Close);
        }
    }

    impl FakeSession {
        fn record(&self, call: Call) {
            self.log.0.lock().unwrap().push(call);
        }
    }

    struct FakeEngine {
        logs: Arc<Mutex<Vec<CallLog>>>,
    }

    impl FakeEngine {
        fn new() -> (Self, Arc<Mutex<Vec<CallLog>>>) {
            let logs = Arc::new(Mutex::new(Vec::new()));
            (Self { logs: logs.clone() }, logs)
        }
    }

    impl MediaEngine for FakeEngine {
        fn new_session(&self) -> Box<dyn MediaSession> {
            let log = CallLog::default();
            self.logs.lock().unwrap().push(log.clone());
            Box::new(FakeSession { log })
        }
    }

    fn manager() -> (
        PeerManager,
        Arc<Mutex<Vec<CallLog>>>,
        mpsc::UnboundedReceiver<(Uuid, serde_json::Value)>,
    ) {
        let (engine, logs) = FakeEngine::new();
        let (tx, rx) = mpsc::unbounded_channel();
        (PeerManager::new(Box::new(engine), tx), logs, rx)
    }

    fn candidate(n: u32) -> serde_json::Value {
        serde_json::json!({"candidate": format!("cand-{n}")})
    }

    fn ice(n: u32) -> serde_json::Value {
        serde_json::json!({"type": "ice-candidate", "candidate": candidate(n)})
    }

    #[tokio::test]
    async fn existing_member_initiates_on_join() {
        let (mut mgr, _logs, mut rx) = manager();
        let peer = Uuid::new_v4();

        mgr.handle_user_joined(peer).await.unwrap();

        let (target, payload) = rx.try_recv().unwrap();
        assert_eq!(target, peer);
        assert_eq!(payload["type"], "offer");
        assert_eq!(mgr.session_count(), 1);
    }

    #[tokio::test]
    async fn offer_creates_session_and_answers() {
        let (mut mgr, logs, mut rx) = manager();
        let peer = Uuid::new_v4();

        mgr.handle_signal(
            peer,
            serde_json::json!({"type": "offer", "description": {"sdp": "their-offer"}}),
        )
        .await
        .unwrap();

        let (target, payload) = rx.try_recv().unwrap();
        assert_eq!(target, peer);
        assert_eq!(payload["type"], "answer");

        let calls = logs.lock().unwrap()[0].calls();
        assert_eq!(
            calls,
            vec![Call::AcceptOffer(serde_json::json!({"sdp": "their-offer"}))]
        );
    }

    #[tokio::test]
    async fn candidates_before_answer_are_queued_then_flushed() {
        let (mut mgr, logs, mut rx) = manager();
        let peer = Uuid::new_v4();

        mgr.handle_user_joined(peer).await.unwrap();
        rx.try_recv().unwrap(); // the offer

        // Peer's candidates trickle in before its answer.
        mgr.handle_signal(peer, ice(1)).await.unwrap();
        mgr.handle_signal(peer, ice(2)).await.unwrap();
        {
            let calls = logs.lock().unwrap()[0].calls();
            assert_eq!(calls, vec![Call::CreateOffer]);
        }

        mgr.handle_signal(
            peer,
            serde_json::json!({"type": "answer", "description": {"sdp": "their-answer"}}),
        )
        .await
        .unwrap();

        let calls = logs.lock().unwrap()[0].calls();
        assert_eq!(
            calls,
            vec![
                Call::CreateOffer,
                Call::AcceptAnswer(serde_json::json!({"sdp": "their-answer"})),
                Call::Candidate(candidate(1)),
                Call::Candidate(candidate(2)),
            ]
        );
    }

    #[tokio::test]
    async fn candidates_before_offer_are_queued_then_flushed() {
        let (mut mgr, logs, _rx) = manager();
        let peer = Uuid::new_v4();

        // Candidates beat the offer entirely — no session yet.
        mgr.handle_signal(peer, ice(1)).await.unwrap();
        assert_eq!(mgr.session_count(), 0);

        mgr.handle_signal(
            peer,
            serde_json::json!({"type": "offer", "description": {"sdp": "o"}}),
        )
        .await
        .unwrap();

        let calls = logs.lock().unwrap()[0].calls();
        assert_eq!(
            calls,
            vec![
                Call::AcceptOffer(serde_json::json!({"sdp": "o"})),
                Call::Candidate(candidate(1)),
            ]
        );
    }

    #[tokio::test]
    async fn candidate_after_remote_description_applies_directly() {
        let (mut mgr, logs, _rx) = manager();
        let peer = Uuid::new_v4();

        mgr.handle_signal(
            peer,
            serde_json::json!({"type": "offer", "description": {"sdp": "o"}}),
        )
        .await
        .unwrap();
        mgr.handle_signal(peer, ice(7)).await.unwrap();

        let calls = logs.lock().unwrap()[0].calls();
        assert_eq!(*calls.last().unwrap(), Call::Candidate(candidate(7)));
    }

    #[tokio::test]
    async fn user_left_tears_down_session() {
        let (mut mgr, logs, _rx) = manager();
        let peer = Uuid::new_v4();

        mgr.handle_user_joined(peer).await.unwrap();
        mgr.handle_user_left(peer).await;

        assert_eq!(mgr.session_count(), 0);
        let calls = logs.lock().unwrap()[0].calls();
        assert_eq!(calls, vec![Call::CreateOffer, Call::Close]);

        // A stale answer from the departed peer is ignored.
        mgr.handle_signal(
            peer,
            serde_json::json!({"type": "answer", "description": {"sdp": "late"}}),
        )
        .await
        .unwrap();
        assert_eq!(mgr.session_count(), 0);
    }

    #[tokio::test]
    async fn reconnected_peer_is_a_fresh_session() {
        let (mut mgr, logs, mut rx) = manager();
        let old_conn = Uuid::new_v4();
        let new_conn = Uuid::new_v4();

        mgr.handle_user_joined(old_conn).await.unwrap();
        rx.try_recv().unwrap();

        // Same human, new connection id: old session dies with its
        // UserLeft, the new one negotiates from scratch.
        mgr.handle_user_left(old_conn).await;
        mgr.handle_user_joined(new_conn).await.unwrap();

        let (target, payload) = rx.try_recv().unwrap();
        assert_eq!(target, new_conn);
        assert_eq!(payload["type"], "offer");
        assert_eq!(logs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reset_closes_every_session() {
        let (mut mgr, logs, _rx) = manager();
        mgr.handle_user_joined(Uuid::new_v4()).await.unwrap();
        mgr.handle_user_joined(Uuid::new_v4()).await.unwrap();

        mgr.reset().await;

        assert_eq!(mgr.session_count(), 0);
        for log in logs.lock().unwrap().iter() {
            assert_eq!(*log.calls().last().unwrap(), Call::Close);
        }
    }
}
