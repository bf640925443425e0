//! Domain records derived from terminal uploads.

use chrono::{DateTime, NaiveDateTime, Utc};
use pushgate_protocol::{AttlogRecord, VerifyMethod};
use serde::Serialize;

/// One terminal-reported punch, as stored.
///
/// Events are insert-only and unique on `(badge_id, timestamp)`; a terminal
/// resending previously uploaded lines (common on retry) must land on the
/// existing row, never a duplicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEvent {
    /// Badge id of the enrolled person.
    pub badge_id: String,
    /// Punch time, terminal-local naive civil time.
    pub timestamp: NaiveDateTime,
    /// Terminal-defined status code, recorded for display only.
    pub status: i32,
    /// Verification method.
    pub verify: VerifyMethod,
    /// Raw source line, kept for audit.
    pub raw: String,
    /// Serial number of the reporting terminal.
    pub serial: String,
    /// When the server received the upload.
    pub received_at: DateTime<Utc>,
}

impl AttendanceEvent {
    /// Builds an event from a parsed punch line.
    pub fn from_record(record: AttlogRecord, serial: &str, received_at: DateTime<Utc>) -> Self {
        Self {
            badge_id: record.badge_id,
            timestamp: record.timestamp,
            status: record.status,
            verify: record.verify,
            raw: record.raw,
            serial: serial.to_string(),
            received_at,
        }
    }

    /// The store uniqueness key.
    pub fn key(&self) -> (String, NaiveDateTime) {
        (self.badge_id.clone(), self.timestamp)
    }
}

/// Whether a session interval is still waiting for its check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Check-in recorded, no check-out yet.
    Open,
    /// Interval complete.
    Closed,
}

/// A derived check-in/check-out interval for one badge id.
///
/// Sessions are produced by toggle pairing over the event stream in arrival
/// order, not timestamp order; a late backlog upload with an older punch
/// still pairs against whatever session is currently open. Callers needing
/// strict temporal intervals must re-derive from the full event history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSession {
    /// Badge id the interval belongs to.
    pub badge_id: String,
    /// Check-in time.
    pub check_in: NaiveDateTime,
    /// Check-out time, absent while the session is open.
    pub check_out: Option<NaiveDateTime>,
    /// Interval state.
    pub state: SessionState,
}

impl AttendanceSession {
    /// Opens a new session at the given check-in time.
    pub fn open(badge_id: impl Into<String>, check_in: NaiveDateTime) -> Self {
        Self {
            badge_id: badge_id.into(),
            check_in,
            check_out: None,
            state: SessionState::Open,
        }
    }

    /// Closes the session at the given check-out time.
    pub fn close(&mut self, check_out: NaiveDateTime) {
        self.check_out = Some(check_out);
        self.state = SessionState::Closed;
    }

    /// Returns true while the session has no check-out.
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn session_open_close() {
        let mut session = AttendanceSession::open("7", ts(8));
        assert!(session.is_open());
        assert!(session.check_out.is_none());

        session.close(ts(17));
        assert!(!session.is_open());
        assert_eq!(session.check_out, Some(ts(17)));
        assert_eq!(session.state, SessionState::Closed);
    }

    #[test]
    fn event_from_record() {
        let record = AttlogRecord::parse("7\t2024-01-10 08:00:00\t0\t1").unwrap();
        let now = Utc::now();
        let event = AttendanceEvent::from_record(record, "AAML1", now);

        assert_eq!(event.badge_id, "7");
        assert_eq!(event.serial, "AAML1");
        assert_eq!(event.received_at, now);
        assert_eq!(event.key(), ("7".to_string(), ts(8)));
    }
}
