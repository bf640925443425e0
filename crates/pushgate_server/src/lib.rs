//! # Pushgate Server
//!
//! Server side of the iClock-style push protocol spoken by biometric
//! attendance terminals.
//!
//! This crate provides:
//! - Request handling for the terminal-facing endpoints (handshake,
//!   ATTLOG upload, mailbox poll, acknowledgement)
//! - Idempotent attendance ingestion with per-line rejection
//! - Toggle-based session pairing (check-in/check-out intervals)
//! - An operator command queue with acknowledgement correlation
//! - Bounded ring buffers for operational visibility
//!
//! # Architecture
//!
//! Terminals have no persistent connection; every exchange is a short
//! HTTP poll the terminal initiates. All server state is therefore shared
//! across independently concurrent requests and lives behind locks in a
//! [`HandlerContext`]. The [`PushServer`] facade wires a context to a
//! [`RequestHandler`] and is the single entry point for both the wire
//! layer and the admin read surface.
//!
//! # Protocol
//!
//! 1. Terminal polls for options; the server answers with a fixed
//!    capability block (`GET OPTION FROM: ...`).
//! 2. Terminal uploads ATTLOG batches; the server dedupes on
//!    `(badge, timestamp)`, pairs events into sessions, and always
//!    answers `OK` unless the store itself fails.
//! 3. Terminal polls its mailbox; a queued operator command is dispatched
//!    exactly once as `C:<id>:<cmd>`.
//! 4. Terminal reports the command outcome; the server correlates the id
//!    back to the dispatched command.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod ingest;
mod model;
mod pairing;
mod queue;
mod ring;
mod server;
mod store;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{DeviceQuery, HandlerContext, ProtocolResponse, RequestHandler};
pub use ingest::{BatchOutcome, Ingestor};
pub use model::{AttendanceEvent, AttendanceSession, SessionState};
pub use pairing::{PairingEngine, PairingOutcome};
pub use queue::{AckOutcome, CommandQueue, DispatchedCommand, PollReply};
pub use ring::{AckEntry, ActivityLog, HandshakeEntry, HitEntry, PollEntry, RingBuffer};
pub use server::PushServer;
pub use store::{EventStore, MemoryStore, StoreError, StoreResult};
