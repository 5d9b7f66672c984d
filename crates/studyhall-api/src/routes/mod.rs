//! API route modules — one per resource.

pub mod ai;
pub mod auth;
pub mod groups;
pub mod health;
pub mod leaderboard;
pub mod messages;
pub mod rooms;
pub mod social;
pub mod tasks;
pub mod users;
