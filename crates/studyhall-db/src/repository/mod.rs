//! Repository modules — one per aggregate, free functions over `&PgPool`.

pub mod groups;
pub mod messages;
pub mod posts;
pub mod rooms;
pub mod stats;
pub mod tasks;
pub mod users;
