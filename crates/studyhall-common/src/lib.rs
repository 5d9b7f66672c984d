//! # studyhall-common
//!
//! Shared foundation for all StudyHall services: configuration, error
//! types, JWT claims, request validation, and the domain models used by
//! both the REST API and the signaling layer.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod signal;
pub mod validation;

pub use error::{HallError, HallResult};
