//! Domain models shared between the API, database, and signaling layers.

pub mod group;
pub mod message;
pub mod room;
pub mod social;
pub mod task;
pub mod user;
