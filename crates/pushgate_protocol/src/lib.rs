//! # Pushgate Protocol
//!
//! Wire types and codecs for the iClock-style terminal push protocol.
//!
//! This crate provides:
//! - `AttlogRecord` for tab-delimited attendance punch lines
//! - `VerifyMethod` for the fixed verification-code enumeration
//! - `HandshakeOptions` and the negotiated option block
//! - Command framing (`C:<id>:<cmd>`) and acknowledgement form decoding
//!
//! This is a pure protocol crate with no I/O operations. Terminals speak
//! newline-terminated plain text; everything here parses from or renders to
//! `String`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attlog;
mod command;
mod error;
mod handshake;
mod verify;

pub use attlog::{parse_batch, AttlogRecord, TIMESTAMP_FORMAT};
pub use command::{frame_command, parse_ack, CommandAck, OK_BODY};
pub use error::{ParseError, ParseResult};
pub use handshake::{HandshakeOptions, HandshakeRequest};
pub use verify::VerifyMethod;
