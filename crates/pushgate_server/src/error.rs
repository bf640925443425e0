//! Error types for the push server.

use crate::store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the push server.
///
/// Almost nothing a terminal sends is an error at the protocol level:
/// malformed punch lines are counted and swallowed, unknown
/// acknowledgements are audited and accepted. A failed store commit is the
/// one condition a terminal is allowed to see, so it can legitimately
/// retry the batch.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The event store could not commit.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A request was missing a field the operation cannot proceed without.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::InvalidRequest(_))
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Store(_) | ServerError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::Store(StoreError::Unavailable("down".into())).is_server_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_server_error());
    }
}
