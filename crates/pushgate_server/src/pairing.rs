//! Toggle-based session pairing.

use crate::model::{AttendanceEvent, AttendanceSession};
use crate::store::{EventStore, StoreResult};
use std::sync::Arc;
use tracing::debug;

/// What a newly accepted event did to the session model.
#[derive(Debug, Clone, PartialEq)]
pub enum PairingOutcome {
    /// The event opened a new session.
    Opened(AttendanceSession),
    /// The event closed the previously open session.
    Closed(AttendanceSession),
}

/// Maintains the open/closed interval model per badge id.
///
/// Pairing is a pure toggle: an event for a badge with an open session
/// closes it (the event's timestamp becomes the check-out), otherwise it
/// opens one. Terminal status codes are recorded on the event but never
/// consulted, so no trust in device-side in/out classification is needed.
///
/// Toggling follows arrival order, not timestamp order: a late backlog
/// upload with an older punch pairs against whatever session is currently
/// open. Callers needing strict temporal intervals must re-derive sessions
/// from the full event history.
pub struct PairingEngine {
    store: Arc<dyn EventStore>,
}

impl PairingEngine {
    /// Creates a pairing engine over the given store.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Applies one newly accepted event to the session model.
    ///
    /// The close-or-open decision is delegated to the store's atomic
    /// toggle, so concurrent uploads for the same badge serialize instead
    /// of both opening a session.
    pub fn apply(&self, event: &AttendanceEvent) -> StoreResult<PairingOutcome> {
        let session = self
            .store
            .toggle_session(&event.badge_id, event.timestamp)?;
        if session.is_open() {
            debug!(badge = %event.badge_id, "session opened");
            Ok(PairingOutcome::Opened(session))
        } else {
            debug!(badge = %event.badge_id, "session closed");
            Ok(PairingOutcome::Closed(session))
        }
    }
}
