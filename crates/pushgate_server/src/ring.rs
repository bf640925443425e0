//! Bounded history buffers for operational visibility.
//!
//! Every inbound terminal call is appended to one of these regardless of
//! outcome. They are purely observational: protocol logic never reads them,
//! and nothing here is durable.

use crate::model::AttendanceEvent;
use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use pushgate_protocol::VerifyMethod;
use serde::Serialize;
use std::collections::VecDeque;

/// Fixed-capacity, insertion-ordered buffer. Oldest entry is evicted on
/// overflow; insertion order is the only ordering guarantee.
#[derive(Debug)]
pub struct RingBuffer<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T: Clone> RingBuffer<T> {
    /// Creates a buffer holding at most `capacity` entries. A zero
    /// capacity is clamped to one, so the buffer always stays bounded.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends an entry, evicting the oldest if the buffer is full.
    pub fn push(&mut self, entry: T) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns all entries, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// Returns the number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A recorded capability handshake.
#[derive(Debug, Clone, Serialize)]
pub struct HandshakeEntry {
    /// Terminal serial number.
    pub serial: String,
    /// Push version the terminal advertised, if any.
    pub push_version: Option<String>,
    /// Server receipt time.
    pub at: DateTime<Utc>,
}

/// One recorded upload line: a parsed punch, or raw text the server
/// could not make sense of. Every line a terminal sends lands here,
/// whatever the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct HitEntry {
    /// Terminal serial number.
    pub serial: String,
    /// Badge id, when the line parsed.
    pub badge_id: Option<String>,
    /// Punch timestamp, when the line parsed.
    pub timestamp: Option<NaiveDateTime>,
    /// Terminal status code, when the line parsed.
    pub status: Option<i32>,
    /// Verification method, when the line parsed.
    pub verify: Option<VerifyMethod>,
    /// Whether the event was newly stored. Always `false` for lines that
    /// did not parse.
    pub stored: bool,
    /// The raw line as received.
    pub raw: String,
    /// Server receipt time.
    pub at: DateTime<Utc>,
}

impl HitEntry {
    /// Entry for a parsed punch, stored or skipped as a duplicate.
    pub fn punch(event: &AttendanceEvent, stored: bool) -> Self {
        Self {
            serial: event.serial.clone(),
            badge_id: Some(event.badge_id.clone()),
            timestamp: Some(event.timestamp),
            status: Some(event.status),
            verify: Some(event.verify),
            stored,
            raw: event.raw.clone(),
            at: event.received_at,
        }
    }

    /// Entry for upload text that could not be parsed as a punch.
    pub fn unparsed(serial: &str, raw: &str, at: DateTime<Utc>) -> Self {
        Self {
            serial: serial.to_string(),
            badge_id: None,
            timestamp: None,
            status: None,
            verify: None,
            stored: false,
            raw: raw.to_string(),
            at,
        }
    }
}

/// A recorded mailbox poll.
#[derive(Debug, Clone, Serialize)]
pub struct PollEntry {
    /// Terminal serial number.
    pub serial: String,
    /// Id of the command dispatched on this poll, if any.
    pub dispatched: Option<u64>,
    /// Server receipt time.
    pub at: DateTime<Utc>,
}

/// A recorded command acknowledgement, matched or not.
#[derive(Debug, Clone, Serialize)]
pub struct AckEntry {
    /// Serial number the ack was correlated under, when known.
    pub serial: Option<String>,
    /// Acknowledged command id.
    pub id: Option<u64>,
    /// Device-side return code.
    pub return_code: Option<i64>,
    /// Command verb reported by the device.
    pub cmd: Option<String>,
    /// Whether the ack matched an outstanding dispatched command.
    pub matched: bool,
    /// Server receipt time.
    pub at: DateTime<Utc>,
}

/// The four per-kind ring buffers, each behind its own lock.
pub struct ActivityLog {
    handshakes: Mutex<RingBuffer<HandshakeEntry>>,
    hits: Mutex<RingBuffer<HitEntry>>,
    polls: Mutex<RingBuffer<PollEntry>>,
    acks: Mutex<RingBuffer<AckEntry>>,
}

impl ActivityLog {
    /// Creates an activity log with the given per-buffer capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            handshakes: Mutex::new(RingBuffer::new(capacity)),
            hits: Mutex::new(RingBuffer::new(capacity)),
            polls: Mutex::new(RingBuffer::new(capacity)),
            acks: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    /// Records a handshake.
    pub fn record_handshake(&self, entry: HandshakeEntry) {
        self.handshakes.lock().push(entry);
    }

    /// Records a raw punch.
    pub fn record_hit(&self, entry: HitEntry) {
        self.hits.lock().push(entry);
    }

    /// Records a mailbox poll.
    pub fn record_poll(&self, entry: PollEntry) {
        self.polls.lock().push(entry);
    }

    /// Records an acknowledgement.
    pub fn record_ack(&self, entry: AckEntry) {
        self.acks.lock().push(entry);
    }

    /// Recent handshakes, oldest first.
    pub fn recent_handshakes(&self) -> Vec<HandshakeEntry> {
        self.handshakes.lock().snapshot()
    }

    /// Recent raw punches, oldest first.
    pub fn recent_hits(&self) -> Vec<HitEntry> {
        self.hits.lock().snapshot()
    }

    /// Recent mailbox polls, oldest first.
    pub fn recent_polls(&self) -> Vec<PollEntry> {
        self.polls.lock().snapshot()
    }

    /// Recent acknowledgements, oldest first.
    pub fn recent_acks(&self) -> Vec<AckEntry> {
        self.acks.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_below_capacity() {
        let mut ring = RingBuffer::new(3);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.snapshot(), vec![1, 2]);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.snapshot(), vec![2, 3, 4]);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn zero_capacity_stays_bounded() {
        let mut ring = RingBuffer::new(0);
        for i in 0..10 {
            ring.push(i);
        }
        assert_eq!(ring.snapshot(), vec![9]);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn empty_ring() {
        let ring: RingBuffer<u8> = RingBuffer::new(2);
        assert!(ring.is_empty());
        assert!(ring.snapshot().is_empty());
    }

    #[test]
    fn activity_log_records() {
        let log = ActivityLog::new(2);
        for i in 0..3 {
            log.record_poll(PollEntry {
                serial: format!("SN{i}"),
                dispatched: None,
                at: Utc::now(),
            });
        }
        let polls = log.recent_polls();
        assert_eq!(polls.len(), 2);
        assert_eq!(polls[0].serial, "SN1");
        assert_eq!(polls[1].serial, "SN2");
    }
}
