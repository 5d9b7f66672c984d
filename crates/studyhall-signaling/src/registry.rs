//! Connection registry — binds a user identity to its live connection.
//!
//! At most one connection is tracked per user. Registering a new
//! connection for a user who already has one returns the superseded
//! handle so the caller can tear down its room memberships and tell the
//! old transport why it is being dropped.

use std::collections::HashMap;
use std::sync::Arc;
use studyhall_common::signal::ServerEvent;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Handle to one live signaling connection. Cheap to clone; sending is
/// non-blocking (unbounded channel drained by the connection's writer
/// task), so fan-out to a slow peer never stalls the others.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    pub connection_id: Uuid,
    pub user_id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnHandle {
    pub fn new(
        connection_id: Uuid,
        user_id: Uuid,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            tx,
        }
    }

    /// Queue an event for delivery. Returns false if the connection's
    /// writer task is gone; callers treat that as a missed delivery,
    /// never as a reason to abort a broadcast.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Two indexes for fast lookups:
/// - `by_user`: user id → handle ("where is this user?")
/// - `by_conn`: connection id → handle (signal relay by target id)
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    by_user: Arc<RwLock<HashMap<Uuid, ConnHandle>>>,
    by_conn: Arc<RwLock<HashMap<Uuid, ConnHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, last-writer-wins. Returns the superseded
    /// handle when the user already had one.
    pub async fn register(&self, handle: ConnHandle) -> Option<ConnHandle> {
        let old = self
            .by_user
            .write()
            .await
            .insert(handle.user_id, handle.clone());

        let mut conns = self.by_conn.write().await;
        if let Some(ref old) = old {
            conns.remove(&old.connection_id);
        }
        conns.insert(handle.connection_id, handle.clone());
        drop(conns);

        if old.is_some() {
            tracing::info!(
                user = %handle.user_id,
                conn = %handle.connection_id,
                "Connection superseded a prior session"
            );
        }
        old
    }

    pub async fn lookup(&self, user_id: Uuid) -> Option<ConnHandle> {
        self.by_user.read().await.get(&user_id).cloned()
    }

    pub async fn lookup_conn(&self, connection_id: Uuid) -> Option<ConnHandle> {
        self.by_conn.read().await.get(&connection_id).cloned()
    }

    /// Remove a user's mapping, but only if it still points at the given
    /// connection. A stale disconnect racing a reconnect must not remove
    /// the newer registration.
    pub async fn unregister(&self, user_id: Uuid, connection_id: Uuid) -> bool {
        let mut users = self.by_user.write().await;
        match users.get(&user_id) {
            Some(h) if h.connection_id == connection_id => {
                users.remove(&user_id);
                drop(users);
                self.by_conn.write().await.remove(&connection_id);
                true
            }
            _ => {
                // Still drop the connection index entry for this id.
                drop(users);
                self.by_conn.write().await.remove(&connection_id);
                false
            }
        }
    }

    pub async fn connected_count(&self) -> usize {
        self.by_user.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(user: Uuid) -> (ConnHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnHandle::new(Uuid::new_v4(), user, tx), rx)
    }

    #[tokio::test]
    async fn register_is_last_writer_wins() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (first, _rx1) = handle(user);
        let (second, _rx2) = handle(user);

        assert!(registry.register(first.clone()).await.is_none());
        let superseded = registry.register(second.clone()).await.unwrap();
        assert_eq!(superseded.connection_id, first.connection_id);

        let current = registry.lookup(user).await.unwrap();
        assert_eq!(current.connection_id, second.connection_id);
        // The stale connection id is no longer routable.
        assert!(registry.lookup_conn(first.connection_id).await.is_none());
        assert!(registry.lookup_conn(second.connection_id).await.is_some());
    }

    #[tokio::test]
    async fn stale_disconnect_does_not_remove_newer_registration() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (old, _rx1) = handle(user);
        let (new, _rx2) = handle(user);

        registry.register(old.clone()).await;
        registry.register(new.clone()).await;

        // The old transport finally closes and fires its cleanup.
        assert!(!registry.unregister(user, old.connection_id).await);
        assert!(registry.lookup(user).await.is_some());

        assert!(registry.unregister(user, new.connection_id).await);
        assert!(registry.lookup(user).await.is_none());
    }

    #[tokio::test]
    async fn unregister_absent_user_is_noop() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.unregister(Uuid::new_v4(), Uuid::new_v4()).await);
    }
}
