//! Command framing and acknowledgement decoding.

use crate::error::{ParseError, ParseResult};
use serde::Deserialize;

/// The bare acknowledgement token every non-handshake reply uses.
///
/// Terminals treat any other body as malformed firmware behavior and retry
/// aggressively, so this exact byte sequence matters.
pub const OK_BODY: &str = "OK\n";

/// Frames a dispatched command for a mailbox poll reply.
pub fn frame_command(id: u64, command: &str) -> String {
    format!("C:{id}:{command}\n")
}

/// A terminal's report of a previously dispatched command's outcome.
///
/// Sent as a URL-encoded form body. `Return` is the device-side exit code
/// (0 for success, negative for firmware errors); it is recorded for audit
/// but never drives a retry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandAck {
    /// Id of the command being acknowledged.
    #[serde(rename = "ID")]
    pub id: u64,
    /// Device-side return code.
    #[serde(rename = "Return")]
    pub return_code: i64,
    /// Command verb the device believes it executed.
    #[serde(rename = "CMD")]
    pub cmd: String,
    /// Serial number, when firmware includes it in the body.
    #[serde(rename = "SN")]
    pub serial: Option<String>,
}

/// Decodes an acknowledgement form body.
pub fn parse_ack(body: &str) -> ParseResult<CommandAck> {
    serde_urlencoded::from_str(body.trim()).map_err(|e| ParseError::BadAckForm(e.to_string()))
}
