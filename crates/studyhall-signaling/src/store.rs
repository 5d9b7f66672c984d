//! Persistence boundary for the signaling layer.
//!
//! The router talks to storage only through these traits, so the core can
//! be exercised in tests with in-memory fakes and no database. The
//! production implementation forwards to the repository layer.

use async_trait::async_trait;
use studyhall_common::HallResult;
use studyhall_common::models::room::RoomRecord;
use uuid::Uuid;

/// Access-control slice of the durable room record, consulted once at
/// join time.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn room_record(&self, room_id: Uuid) -> HallResult<Option<RoomRecord>>;
}

/// Best-effort mirror of live presence into durable participant rows.
/// Failures are logged by the caller and never block the signaling path.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn set_online(&self, room_id: Uuid, user_id: Uuid, online: bool) -> HallResult<()>;
}

/// Durable chat and pin writes. Chat persistence runs in parallel with
/// the live relay; pin persistence gates the pin broadcast.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn persist_message(
        &self,
        message_id: Uuid,
        room_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> HallResult<()>;

    /// Returns the stored pin's id.
    async fn persist_pin(
        &self,
        room_id: Uuid,
        message_id: Uuid,
        pinned_by: Uuid,
    ) -> HallResult<Uuid>;
}

/// Database-backed implementation of the whole boundary.
#[derive(Clone)]
pub struct DbStore {
    db: studyhall_db::Database,
}

impl DbStore {
    pub fn new(db: studyhall_db::Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoomDirectory for DbStore {
    async fn room_record(&self, room_id: Uuid) -> HallResult<Option<RoomRecord>> {
        Ok(studyhall_db::repository::rooms::room_record(&self.db.pool, room_id).await?)
    }
}

#[async_trait]
impl PresenceStore for DbStore {
    async fn set_online(&self, room_id: Uuid, user_id: Uuid, online: bool) -> HallResult<()> {
        studyhall_db::repository::rooms::set_participant_online(
            &self.db.pool,
            room_id,
            user_id,
            online,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatStore for DbStore {
    async fn persist_message(
        &self,
        message_id: Uuid,
        room_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> HallResult<()> {
        studyhall_db::repository::messages::insert_room_message(
            &self.db.pool,
            message_id,
            room_id,
            user_id,
            content,
        )
        .await?;
        Ok(())
    }

    async fn persist_pin(
        &self,
        room_id: Uuid,
        message_id: Uuid,
        pinned_by: Uuid,
    ) -> HallResult<Uuid> {
        let pin = studyhall_db::repository::messages::insert_pin(
            &self.db.pool,
            room_id,
            message_id,
            pinned_by,
        )
        .await?;
        Ok(pin.id)
    }
}
