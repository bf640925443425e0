//! Event store seam and in-memory reference implementation.

use crate::model::{AttendanceEvent, AttendanceSession};
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use std::collections::HashSet;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by an event store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or could not commit.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for raw events and derived sessions.
///
/// This is the seam to the surrounding system's persistence layer. The
/// contract the protocol depends on: `insert_event` is insert-if-absent and
/// atomic with respect to concurrent uploads, so two overlapping retried
/// batches can never double-insert the same `(badge, timestamp)` pair.
pub trait EventStore: Send + Sync {
    /// Inserts an event unless one with the same `(badge, timestamp)` key
    /// exists. Returns `true` if the event was stored, `false` on a
    /// duplicate.
    fn insert_event(&self, event: AttendanceEvent) -> StoreResult<bool>;

    /// Returns events for a badge, newest first, capped at `limit`.
    fn events_for_badge(&self, badge_id: &str, limit: usize) -> StoreResult<Vec<AttendanceEvent>>;

    /// Returns the currently open session for a badge, if any.
    fn open_session(&self, badge_id: &str) -> StoreResult<Option<AttendanceSession>>;

    /// Toggles the session model for a badge: closes the open session at
    /// `timestamp` if one exists, otherwise opens a new one checked in at
    /// `timestamp`. Returns the resulting session.
    ///
    /// The lookup and the write must happen under one lock (or one
    /// transaction); two concurrent toggles for the same badge must
    /// serialize, never both observe "no open session".
    fn toggle_session(
        &self,
        badge_id: &str,
        timestamp: NaiveDateTime,
    ) -> StoreResult<AttendanceSession>;

    /// Returns sessions whose check-in falls on `date` for a badge, in
    /// creation order.
    fn sessions_on(&self, badge_id: &str, date: NaiveDate) -> StoreResult<Vec<AttendanceSession>>;
}

#[derive(Default)]
struct MemoryInner {
    events: Vec<AttendanceEvent>,
    seen: HashSet<(String, NaiveDateTime)>,
    sessions: Vec<AttendanceSession>,
}

/// In-memory event store.
///
/// Reference implementation used by tests and single-process deployments;
/// a single `RwLock` makes the duplicate check and insert atomic, matching
/// the unique-constraint semantics a relational store provides.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored events.
    pub fn event_count(&self) -> usize {
        self.inner.read().events.len()
    }

    /// Returns the total number of sessions, open and closed.
    pub fn session_count(&self) -> usize {
        self.inner.read().sessions.len()
    }
}

impl EventStore for MemoryStore {
    fn insert_event(&self, event: AttendanceEvent) -> StoreResult<bool> {
        let mut inner = self.inner.write();
        if !inner.seen.insert(event.key()) {
            return Ok(false);
        }
        inner.events.push(event);
        Ok(true)
    }

    fn events_for_badge(&self, badge_id: &str, limit: usize) -> StoreResult<Vec<AttendanceEvent>> {
        let inner = self.inner.read();
        Ok(inner
            .events
            .iter()
            .rev()
            .filter(|e| e.badge_id == badge_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn open_session(&self, badge_id: &str) -> StoreResult<Option<AttendanceSession>> {
        let inner = self.inner.read();
        Ok(inner
            .sessions
            .iter()
            .rev()
            .find(|s| s.badge_id == badge_id && s.is_open())
            .cloned())
    }

    fn toggle_session(
        &self,
        badge_id: &str,
        timestamp: NaiveDateTime,
    ) -> StoreResult<AttendanceSession> {
        let mut inner = self.inner.write();
        let open = inner
            .sessions
            .iter_mut()
            .rev()
            .find(|s| s.badge_id == badge_id && s.is_open());
        if let Some(session) = open {
            session.close(timestamp);
            return Ok(session.clone());
        }
        let session = AttendanceSession::open(badge_id, timestamp);
        inner.sessions.push(session.clone());
        Ok(session)
    }

    fn sessions_on(&self, badge_id: &str, date: NaiveDate) -> StoreResult<Vec<AttendanceSession>> {
        let inner = self.inner.read();
        Ok(inner
            .sessions
            .iter()
            .filter(|s| s.badge_id == badge_id && s.check_in.date() == date)
            .cloned()
            .collect())
    }
}
