//! Request handling for the terminal-facing endpoints.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::ingest::Ingestor;
use crate::queue::{AckOutcome, CommandQueue, PollReply};
use crate::ring::{AckEntry, ActivityLog, HandshakeEntry, HitEntry, PollEntry};
use crate::store::EventStore;
use chrono::Utc;
use pushgate_protocol::{frame_command, parse_ack, HandshakeRequest, OK_BODY};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The `table` value under which terminals upload punch batches.
const ATTLOG_TABLE: &str = "ATTLOG";

/// Cap on raw body text kept for a dropped upload's audit entry.
const RAW_AUDIT_CAP: usize = 512;

fn truncate_raw(body: &str) -> &str {
    match body.char_indices().nth(RAW_AUDIT_CAP) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Query parameters a terminal sends on the shared data endpoint.
#[derive(Debug, Clone, Default)]
pub struct DeviceQuery {
    /// Terminal serial number (`SN`).
    pub serial: Option<String>,
    /// Target table for uploads (`table`).
    pub table: Option<String>,
    /// Legacy capability-discovery marker (`options`).
    pub options: Option<String>,
    /// Advertised push-protocol version (`pushver`).
    pub push_version: Option<String>,
}

impl DeviceQuery {
    /// True when the poll is asking for the capability block.
    fn wants_handshake(&self) -> bool {
        self.options.as_deref() == Some("all") || self.push_version.is_some()
    }

    fn serial(&self) -> &str {
        self.serial.as_deref().unwrap_or_default()
    }
}

/// A reply on the terminal-facing wire.
///
/// Terminals only understand newline-terminated plain text; anything that
/// is not one of these shapes reads as malformed firmware behavior on the
/// device and triggers aggressive retries.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolResponse {
    /// The bare acknowledgement token.
    Ok,
    /// The negotiated capability block.
    Handshake(String),
    /// A framed command dispatch.
    Command(String),
}

impl ProtocolResponse {
    /// Renders the exact response body.
    pub fn into_body(self) -> String {
        match self {
            ProtocolResponse::Ok => OK_BODY.to_string(),
            ProtocolResponse::Handshake(block) => block,
            ProtocolResponse::Command(framed) => framed,
        }
    }
}

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Event store (shared across all handlers).
    pub store: Arc<dyn EventStore>,
    /// Command mailbox state.
    pub queue: CommandQueue,
    /// Observability ring buffers.
    pub activity: ActivityLog,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<dyn EventStore>) -> Self {
        let activity = ActivityLog::new(config.ring_capacity);
        Self {
            config,
            store,
            queue: CommandQueue::new(),
            activity,
        }
    }
}

/// Handler for terminal requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
    ingestor: Ingestor,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        let ingestor = Ingestor::new(Arc::clone(&context.store));
        Self { context, ingestor }
    }

    /// Handles a discovery poll on the data endpoint.
    ///
    /// Never errors: a plain poll gets the bare token, a capability poll
    /// gets the negotiated block. Both are pure functions of configuration
    /// plus the inbound serial, so terminal-side retries are harmless.
    pub fn handle_cdata_get(&self, query: &DeviceQuery) -> ProtocolResponse {
        if !query.wants_handshake() {
            return ProtocolResponse::Ok;
        }

        let request = HandshakeRequest::new(query.serial(), query.push_version.clone());
        self.context.activity.record_handshake(HandshakeEntry {
            serial: request.serial.clone(),
            push_version: request.push_version.clone(),
            at: Utc::now(),
        });
        info!(serial = %request.serial, pushver = ?request.push_version, "handshake");

        let block = self
            .context
            .config
            .handshake_options()
            .render(&request.serial);
        ProtocolResponse::Handshake(block)
    }

    /// Handles a data upload on the data endpoint.
    ///
    /// Only `table=ATTLOG` bodies are ingested; other tables (OPERLOG,
    /// options dumps) are accepted and dropped so firmware stays happy.
    /// Per-line parse failures are swallowed and counted; a store failure
    /// is the single condition that surfaces, so the terminal can retry
    /// the whole batch against the idempotent ingest path. Every upload
    /// leaves a trace in the activity log, whatever its fate.
    pub fn handle_cdata_post(&self, query: &DeviceQuery, body: &str) -> ServerResult<ProtocolResponse> {
        let received_at = Utc::now();
        let serial = query.serial();

        if query.table.as_deref() != Some(ATTLOG_TABLE) {
            debug!(serial, table = ?query.table, "non-ATTLOG upload dropped");
            self.context
                .activity
                .record_hit(HitEntry::unparsed(serial, truncate_raw(body), received_at));
            return Ok(ProtocolResponse::Ok);
        }

        let (outcome, audit) = self.ingestor.ingest(serial, body, received_at)?;
        for entry in audit {
            self.context.activity.record_hit(entry);
        }

        info!(
            serial,
            stored = outcome.stored,
            skipped = outcome.skipped,
            malformed = outcome.malformed,
            "attlog batch"
        );
        Ok(ProtocolResponse::Ok)
    }

    /// Handles a mailbox poll.
    pub fn handle_getrequest(&self, serial: &str) -> ProtocolResponse {
        let reply = self.context.queue.poll(serial);
        let dispatched = match &reply {
            PollReply::Dispatch(d) => Some(d.id),
            PollReply::Idle => None,
        };
        self.context.activity.record_poll(PollEntry {
            serial: serial.to_string(),
            dispatched,
            at: Utc::now(),
        });

        match reply {
            PollReply::Dispatch(d) => ProtocolResponse::Command(frame_command(d.id, &d.command)),
            PollReply::Idle => ProtocolResponse::Ok,
        }
    }

    /// Handles an acknowledgement submission.
    ///
    /// Always answers with the bare token; an unparseable or mismatched
    /// ack is recorded for audit and otherwise ignored at the protocol
    /// level.
    pub fn handle_devicecmd(&self, serial: Option<&str>, body: &str) -> ProtocolResponse {
        let at = Utc::now();
        let ack = match parse_ack(body) {
            Ok(ack) => ack,
            Err(err) => {
                warn!(serial = ?serial, %err, "unparseable acknowledgement");
                self.context.activity.record_ack(AckEntry {
                    serial: serial.map(str::to_string),
                    id: None,
                    return_code: None,
                    cmd: None,
                    matched: false,
                    at,
                });
                return ProtocolResponse::Ok;
            }
        };

        let outcome = self.context.queue.acknowledge(serial, &ack);
        let matched = matches!(outcome, AckOutcome::Cleared(_));
        if let AckOutcome::Cleared(command) = &outcome {
            info!(
                serial = ?serial.or(ack.serial.as_deref()),
                id = command.id,
                return_code = ack.return_code,
                "command acknowledged"
            );
        }

        self.context.activity.record_ack(AckEntry {
            serial: serial
                .map(str::to_string)
                .or_else(|| ack.serial.clone()),
            id: Some(ack.id),
            return_code: Some(ack.return_code),
            cmd: Some(ack.cmd.clone()),
            matched,
            at,
        });
        ProtocolResponse::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceEvent, AttendanceSession};
    use crate::store::{MemoryStore, StoreError, StoreResult};
    use chrono::{NaiveDate, NaiveDateTime};

    fn create_handler() -> (RequestHandler, Arc<HandlerContext>) {
        let store = Arc::new(MemoryStore::new());
        let context = Arc::new(HandlerContext::new(ServerConfig::default(), store));
        (RequestHandler::new(Arc::clone(&context)), context)
    }

    fn attlog_query(serial: &str) -> DeviceQuery {
        DeviceQuery {
            serial: Some(serial.to_string()),
            table: Some("ATTLOG".to_string()),
            ..DeviceQuery::default()
        }
    }

    #[test]
    fn plain_poll_gets_ok() {
        let (handler, _) = create_handler();
        let query = DeviceQuery {
            serial: Some("AAML1".to_string()),
            ..DeviceQuery::default()
        };
        assert_eq!(handler.handle_cdata_get(&query), ProtocolResponse::Ok);
        assert_eq!(ProtocolResponse::Ok.into_body(), "OK\n");
    }

    #[test]
    fn pushver_poll_gets_server_version() {
        let (handler, context) = create_handler();
        let query = DeviceQuery {
            serial: Some("AAML1".to_string()),
            push_version: Some("2.3.0".to_string()),
            ..DeviceQuery::default()
        };

        let body = handler.handle_cdata_get(&query).into_body();
        assert!(body.starts_with("GET OPTION FROM: AAML1\n"));
        // Server version wins regardless of the device's advertised one.
        assert!(body.contains(&format!("PushProtVer={}\n", context.config.push_version)));
        assert_eq!(context.activity.recent_handshakes().len(), 1);
    }

    #[test]
    fn options_all_poll_gets_block() {
        let (handler, _) = create_handler();
        let query = DeviceQuery {
            serial: Some("AAML1".to_string()),
            options: Some("all".to_string()),
            ..DeviceQuery::default()
        };
        assert!(matches!(
            handler.handle_cdata_get(&query),
            ProtocolResponse::Handshake(_)
        ));
    }

    #[test]
    fn attlog_upload_stores_and_acks() {
        let (handler, context) = create_handler();
        let body = "7\t2024-01-10 08:00:00\t0\t1\n7\t2024-01-10 17:00:00\t1\t1\n";

        let response = handler
            .handle_cdata_post(&attlog_query("AAML1"), body)
            .unwrap();
        assert_eq!(response, ProtocolResponse::Ok);

        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let sessions = context.store.sessions_on("7", day).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].check_in, day.and_hms_opt(8, 0, 0).unwrap());
        assert_eq!(sessions[0].check_out, Some(day.and_hms_opt(17, 0, 0).unwrap()));
        assert_eq!(context.activity.recent_hits().len(), 2);
    }

    #[test]
    fn malformed_batch_still_acks_and_leaves_a_trace() {
        let (handler, context) = create_handler();
        let response = handler
            .handle_cdata_post(&attlog_query("AAML1"), "complete garbage\n")
            .unwrap();
        assert_eq!(response, ProtocolResponse::Ok);

        let hits = context.activity.recent_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].raw, "complete garbage");
        assert!(hits[0].badge_id.is_none());
        assert!(!hits[0].stored);
    }

    #[test]
    fn other_table_dropped_with_ok_and_a_trace() {
        let (handler, context) = create_handler();
        let query = DeviceQuery {
            serial: Some("AAML1".to_string()),
            table: Some("OPERLOG".to_string()),
            ..DeviceQuery::default()
        };
        let response = handler.handle_cdata_post(&query, "anything\n").unwrap();
        assert_eq!(response, ProtocolResponse::Ok);

        let hits = context.activity.recent_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].raw, "anything\n");
        assert!(hits[0].badge_id.is_none());
    }

    #[test]
    fn mailbox_poll_dispatches_once() {
        let (handler, context) = create_handler();
        context.queue.enqueue("AAML1", "REBOOT");

        let first = handler.handle_getrequest("AAML1").into_body();
        assert_eq!(first, "C:1:REBOOT\n");

        let second = handler.handle_getrequest("AAML1").into_body();
        assert_eq!(second, "OK\n");
        assert_eq!(context.activity.recent_polls().len(), 2);
    }

    #[test]
    fn idle_mailbox_poll_is_exactly_ok() {
        let (handler, _) = create_handler();
        assert_eq!(handler.handle_getrequest("AAML1").into_body(), "OK\n");
    }

    #[test]
    fn ack_roundtrip() {
        let (handler, context) = create_handler();
        context.queue.enqueue("AAML1", "REBOOT");
        handler.handle_getrequest("AAML1");

        let response = handler.handle_devicecmd(Some("AAML1"), "ID=1&Return=0&CMD=REBOOT");
        assert_eq!(response, ProtocolResponse::Ok);
        assert!(context.queue.outstanding("AAML1").is_none());

        let acks = context.activity.recent_acks();
        assert_eq!(acks.len(), 1);
        assert!(acks[0].matched);
    }

    #[test]
    fn mismatched_ack_keeps_waiting_state() {
        let (handler, context) = create_handler();
        context.queue.enqueue("AAML1", "REBOOT");
        handler.handle_getrequest("AAML1");

        handler.handle_devicecmd(Some("AAML1"), "ID=42&Return=0&CMD=REBOOT");
        assert!(context.queue.outstanding("AAML1").is_some());
        assert!(!context.activity.recent_acks()[0].matched);
    }

    #[test]
    fn unparseable_ack_still_acks() {
        let (handler, context) = create_handler();
        let response = handler.handle_devicecmd(Some("AAML1"), "not a form at all");
        assert_eq!(response, ProtocolResponse::Ok);
        assert_eq!(context.activity.recent_acks().len(), 1);
    }

    /// A store that refuses every write, for the one error path terminals
    /// are allowed to see.
    struct FailingStore;

    impl EventStore for FailingStore {
        fn insert_event(&self, _event: AttendanceEvent) -> StoreResult<bool> {
            Err(StoreError::Unavailable("disk full".into()))
        }
        fn events_for_badge(&self, _: &str, _: usize) -> StoreResult<Vec<AttendanceEvent>> {
            Ok(Vec::new())
        }
        fn open_session(&self, _: &str) -> StoreResult<Option<AttendanceSession>> {
            Ok(None)
        }
        fn toggle_session(
            &self,
            badge_id: &str,
            timestamp: NaiveDateTime,
        ) -> StoreResult<AttendanceSession> {
            Ok(AttendanceSession::open(badge_id, timestamp))
        }
        fn sessions_on(&self, _: &str, _: NaiveDate) -> StoreResult<Vec<AttendanceSession>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn store_failure_surfaces() {
        let context = Arc::new(HandlerContext::new(
            ServerConfig::default(),
            Arc::new(FailingStore),
        ));
        let handler = RequestHandler::new(Arc::clone(&context));

        let result = handler.handle_cdata_post(&attlog_query("AAML1"), "7\t2024-01-10 08:00:00\t0\t1\n");
        assert!(result.is_err());
    }
}
