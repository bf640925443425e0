//! Error types for protocol parsing.

use thiserror::Error;

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while parsing protocol payloads.
#[derive(Error, Debug)]
pub enum ParseError {
    /// A punch line had fewer fields than the grammar requires.
    #[error("line has {found} fields, expected at least {expected}")]
    TooFewFields {
        /// Fields found on the line.
        found: usize,
        /// Minimum fields required.
        expected: usize,
    },

    /// The badge id field was empty.
    #[error("empty badge id")]
    EmptyBadgeId,

    /// The timestamp field did not match `YYYY-MM-DD HH:MM:SS`.
    #[error("bad timestamp {value:?}: {source}")]
    BadTimestamp {
        /// The offending field text.
        value: String,
        /// Underlying chrono parse error.
        #[source]
        source: chrono::ParseError,
    },

    /// A numeric field did not parse as an integer.
    #[error("bad numeric field {value:?}")]
    BadNumber {
        /// The offending field text.
        value: String,
    },

    /// An acknowledgement body could not be decoded as a URL-encoded form.
    #[error("bad acknowledgement form: {0}")]
    BadAckForm(String),
}
