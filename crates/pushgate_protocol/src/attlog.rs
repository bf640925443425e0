//! ATTLOG line parsing.

use crate::error::{ParseError, ParseResult};
use crate::verify::VerifyMethod;
use chrono::NaiveDateTime;

/// Timestamp format used by terminals in ATTLOG uploads.
///
/// The value is the device's local wall clock; no timezone conversion is
/// attempted because terminal and server may disagree on zone. That is an
/// accepted limitation of the protocol, not something to "fix" silently.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Minimum tab-separated fields on a valid punch line.
const MIN_FIELDS: usize = 4;

/// One parsed attendance punch line.
///
/// Wire grammar (tab-separated, trailing fields ignored):
///
/// ```text
/// <badge id> \t <YYYY-MM-DD HH:MM:SS> \t <status> \t <verify code> [\t ...]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttlogRecord {
    /// Terminal-assigned badge id of the enrolled person.
    pub badge_id: String,
    /// Punch time, terminal-local naive civil time.
    pub timestamp: NaiveDateTime,
    /// Terminal-defined status code (e.g. check-in/check-out). Recorded
    /// verbatim; never authoritative for session pairing.
    pub status: i32,
    /// Verification method, mapped through the fixed code table.
    pub verify: VerifyMethod,
    /// The raw source line, kept for audit.
    pub raw: String,
}

impl AttlogRecord {
    /// Parses one punch line.
    pub fn parse(line: &str) -> ParseResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields {
                found: fields.len(),
                expected: MIN_FIELDS,
            });
        }

        let badge_id = fields[0].trim();
        if badge_id.is_empty() {
            return Err(ParseError::EmptyBadgeId);
        }

        let ts_text = fields[1].trim();
        let timestamp = NaiveDateTime::parse_from_str(ts_text, TIMESTAMP_FORMAT).map_err(
            |source| ParseError::BadTimestamp {
                value: ts_text.to_string(),
                source,
            },
        )?;

        let status = parse_int(fields[2])?;
        let verify_code = parse_int(fields[3])?;

        Ok(Self {
            badge_id: badge_id.to_string(),
            timestamp,
            status,
            verify: VerifyMethod::from_code(verify_code),
            raw: line.to_string(),
        })
    }
}

fn parse_int(field: &str) -> ParseResult<i32> {
    field.trim().parse().map_err(|_| ParseError::BadNumber {
        value: field.to_string(),
    })
}

/// Parses an ATTLOG batch body, one record per line.
///
/// Blank lines (firmware always terminates the body with a newline) are
/// skipped entirely; every other line yields its raw text paired with
/// either a record or a parse error, in batch order, so callers can count
/// and audit rejects without aborting.
pub fn parse_batch(body: &str) -> Vec<(&str, ParseResult<AttlogRecord>)> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| (line, AttlogRecord::parse(line)))
        .collect()
}
