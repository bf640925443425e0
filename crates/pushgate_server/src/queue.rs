//! Operator command queue and acknowledgement correlation.

use parking_lot::Mutex;
use pushgate_protocol::CommandAck;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A command that has been sent to a terminal and awaits acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedCommand {
    /// Correlation id minted at dispatch time.
    pub id: u64,
    /// The command text that was framed onto the wire.
    pub command: String,
}

/// Outcome of a mailbox poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollReply {
    /// Nothing to dispatch; the terminal gets the bare `OK` token.
    Idle,
    /// A command was dispatched on this poll.
    Dispatch(DispatchedCommand),
}

/// Outcome of an acknowledgement submission.
#[derive(Debug, Clone, PartialEq)]
pub enum AckOutcome {
    /// The ack matched the outstanding command; waiting state cleared.
    Cleared(DispatchedCommand),
    /// The acked id does not match the outstanding id for that serial.
    IdMismatch {
        /// Id the server is waiting on.
        expected: u64,
        /// Id the terminal reported.
        reported: u64,
    },
    /// No command is outstanding for that serial number.
    NothingOutstanding,
    /// The ack carried no serial number to correlate under.
    NoSerial,
}

#[derive(Default)]
struct QueueInner {
    /// Pending command text per serial, not yet dispatched.
    pending: HashMap<String, String>,
    /// Dispatched-but-unacknowledged command per serial.
    waiting: HashMap<String, DispatchedCommand>,
    next_id: u64,
}

/// Per-terminal command mailbox.
///
/// Operators enqueue a command for a serial number; it is dispatched on
/// that terminal's next mailbox poll and then held in a waiting-ack map
/// until the terminal reports back. A terminal that never acknowledges
/// leaves its mailbox blocked indefinitely; no expiry is applied.
#[derive(Default)]
pub struct CommandQueue {
    inner: Mutex<QueueInner>,
}

impl CommandQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a command for a terminal.
    ///
    /// Returns `false` if a command was already pending for that serial;
    /// re-enqueueing is a no-op and the earlier text stays queued.
    pub fn enqueue(&self, serial: &str, command: impl Into<String>) -> bool {
        let mut inner = self.inner.lock();
        let fresh = match inner.pending.entry(serial.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(command.into());
                true
            }
            Entry::Occupied(_) => false,
        };
        debug!(serial, fresh, "command enqueued");
        fresh
    }

    /// Answers a terminal's mailbox poll.
    ///
    /// A serial with an outstanding unacknowledged command is told `Idle`
    /// rather than re-dispatched, so a retried poll cannot execute the same
    /// command twice.
    pub fn poll(&self, serial: &str) -> PollReply {
        let mut inner = self.inner.lock();
        if inner.waiting.contains_key(serial) {
            return PollReply::Idle;
        }
        match inner.pending.remove(serial) {
            Some(command) => {
                inner.next_id += 1;
                let dispatched = DispatchedCommand {
                    id: inner.next_id,
                    command,
                };
                inner
                    .waiting
                    .insert(serial.to_string(), dispatched.clone());
                debug!(serial, id = dispatched.id, "command dispatched");
                PollReply::Dispatch(dispatched)
            }
            None => PollReply::Idle,
        }
    }

    /// Correlates a terminal's acknowledgement to its dispatched command.
    ///
    /// A matching id clears the waiting entry regardless of the device's
    /// return code; delivery and execution outcome are separate concerns
    /// and nothing is retried automatically. Mismatched or unknown ids
    /// leave the queue untouched.
    pub fn acknowledge(&self, serial: Option<&str>, ack: &CommandAck) -> AckOutcome {
        let serial = match serial.or(ack.serial.as_deref()) {
            Some(s) => s,
            None => {
                warn!(id = ack.id, "acknowledgement without serial number");
                return AckOutcome::NoSerial;
            }
        };

        let mut inner = self.inner.lock();
        let expected = match inner.waiting.get(serial) {
            Some(outstanding) => outstanding.id,
            None => {
                warn!(serial, id = ack.id, "acknowledgement with nothing outstanding");
                return AckOutcome::NothingOutstanding;
            }
        };

        if expected != ack.id {
            warn!(
                serial,
                expected,
                reported = ack.id,
                "acknowledgement id mismatch"
            );
            return AckOutcome::IdMismatch {
                expected,
                reported: ack.id,
            };
        }

        match inner.waiting.remove(serial) {
            Some(command) => AckOutcome::Cleared(command),
            // Unreachable: the entry was present under the same lock.
            None => AckOutcome::NothingOutstanding,
        }
    }

    /// Returns true if a command is queued but not yet dispatched.
    pub fn has_pending(&self, serial: &str) -> bool {
        self.inner.lock().pending.contains_key(serial)
    }

    /// Returns the dispatched command still awaiting acknowledgement.
    pub fn outstanding(&self, serial: &str) -> Option<DispatchedCommand> {
        self.inner.lock().waiting.get(serial).cloned()
    }
}
