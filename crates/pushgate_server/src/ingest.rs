//! ATTLOG batch ingestion.

use crate::model::AttendanceEvent;
use crate::pairing::PairingEngine;
use crate::ring::HitEntry;
use crate::store::{EventStore, StoreResult};
use chrono::{DateTime, Utc};
use pushgate_protocol::parse_batch;
use std::sync::Arc;
use tracing::warn;

/// Per-batch ingestion counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    /// Lines persisted as new events.
    pub stored: usize,
    /// Well-formed lines skipped as duplicates (idempotent retry).
    pub skipped: usize,
    /// Lines rejected by the parser.
    pub malformed: usize,
}

/// Parses, dedupes, and persists ATTLOG uploads.
///
/// Per-line failures never abort the batch: a terminal that sees anything
/// but success for a batch it sent will resend the backlog forever. Only a
/// store failure propagates, which is the one case where a retry is the
/// right terminal behavior.
pub struct Ingestor {
    store: Arc<dyn EventStore>,
    pairing: PairingEngine,
}

impl Ingestor {
    /// Creates an ingestor over the given store.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        let pairing = PairingEngine::new(Arc::clone(&store));
        Self { store, pairing }
    }

    /// Ingests one upload body from a terminal.
    ///
    /// Returns the batch counters plus one audit entry per non-blank
    /// line, in batch order: parsed punches carry their stored flag
    /// (`false` on a duplicate retry), rejected lines carry the raw
    /// text. Nothing a terminal sends goes unrecorded.
    pub fn ingest(
        &self,
        serial: &str,
        body: &str,
        received_at: DateTime<Utc>,
    ) -> StoreResult<(BatchOutcome, Vec<HitEntry>)> {
        let mut outcome = BatchOutcome::default();
        let mut audit = Vec::new();

        for (line, parsed) in parse_batch(body) {
            let record = match parsed {
                Ok(record) => record,
                Err(err) => {
                    warn!(serial, %err, "rejected punch line");
                    outcome.malformed += 1;
                    audit.push(HitEntry::unparsed(serial, line, received_at));
                    continue;
                }
            };

            let event = AttendanceEvent::from_record(record, serial, received_at);
            let stored = self.store.insert_event(event.clone())?;
            if stored {
                self.pairing.apply(&event)?;
                outcome.stored += 1;
            } else {
                outcome.skipped += 1;
            }
            audit.push(HitEntry::punch(&event, stored));
        }

        Ok((outcome, audit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn ingest(store: Arc<MemoryStore>, body: &str) -> BatchOutcome {
        let ingestor = Ingestor::new(store);
        let (outcome, _) = ingestor.ingest("AAML1", body, Utc::now()).unwrap();
        outcome
    }

    const TWO_PUNCHES: &str = "7\t2024-01-10 08:00:00\t0\t1\n7\t2024-01-10 17:00:00\t1\t1\n";

    #[test]
    fn stores_and_pairs_a_day() {
        let store = Arc::new(MemoryStore::new());
        let outcome = ingest(store.clone(), TWO_PUNCHES);

        assert_eq!(outcome.stored, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.malformed, 0);
        assert_eq!(store.event_count(), 2);

        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let sessions = store.sessions_on("7", day).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].check_in, day.and_hms_opt(8, 0, 0).unwrap());
        assert_eq!(
            sessions[0].check_out,
            Some(day.and_hms_opt(17, 0, 0).unwrap())
        );
    }

    #[test]
    fn resubmission_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = Ingestor::new(store.clone());

        let (first, _) = ingestor.ingest("AAML1", TWO_PUNCHES, Utc::now()).unwrap();
        let (second, _) = ingestor.ingest("AAML1", TWO_PUNCHES, Utc::now()).unwrap();

        assert_eq!(first.stored, 2);
        assert_eq!(second.stored, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.event_count(), 2);
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn malformed_lines_do_not_abort() {
        let store = Arc::new(MemoryStore::new());
        let body = "garbage line\n7\t2024-01-10 08:00:00\t0\t1\n7\tnot-a-date\t0\t1\n";
        let outcome = ingest(store.clone(), body);

        assert_eq!(outcome.stored, 1);
        assert_eq!(outcome.malformed, 2);
        assert_eq!(store.event_count(), 1);
    }

    #[test]
    fn empty_body() {
        let store = Arc::new(MemoryStore::new());
        let outcome = ingest(store, "\n");
        assert_eq!(outcome, BatchOutcome::default());
    }

    #[test]
    fn audit_covers_batch_in_order() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = Ingestor::new(store);
        let (_, audit) = ingestor.ingest("AAML1", TWO_PUNCHES, Utc::now()).unwrap();

        assert_eq!(audit.len(), 2);
        assert!(audit[0].timestamp.unwrap() < audit[1].timestamp.unwrap());
        assert_eq!(audit[0].serial, "AAML1");
        assert!(audit.iter().all(|hit| hit.stored));
    }

    #[test]
    fn duplicate_punches_flagged_not_stored() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = Ingestor::new(store);
        ingestor.ingest("AAML1", TWO_PUNCHES, Utc::now()).unwrap();
        let (_, audit) = ingestor.ingest("AAML1", TWO_PUNCHES, Utc::now()).unwrap();

        assert_eq!(audit.len(), 2);
        assert!(audit.iter().all(|hit| !hit.stored));
    }

    #[test]
    fn rejected_lines_audited_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = Ingestor::new(store);
        let body = "garbage line\n7\t2024-01-10 08:00:00\t0\t1\n";
        let (_, audit) = ingestor.ingest("AAML1", body, Utc::now()).unwrap();

        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].raw, "garbage line");
        assert!(audit[0].badge_id.is_none());
        assert!(!audit[0].stored);
        assert_eq!(audit[1].badge_id.as_deref(), Some("7"));
    }
}
