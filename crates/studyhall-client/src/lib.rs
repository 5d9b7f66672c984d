//! # studyhall-client
//!
//! Client SDK for the StudyHall signaling channel.
//!
//! Two layers:
//! - [`signaling`] — WebSocket transport client with auto-reconnect;
//!   speaks the wire contract from `studyhall_common::signal`.
//! - [`peer`] — drives pairwise WebRTC negotiation for room members:
//!   initiator/answerer roles, trickle-ICE candidate queuing, and session
//!   teardown, with the media stack itself behind a trait.

pub mod error;
pub mod peer;
pub mod signaling;

pub use error::{ClientError, Result};
