//! Push server facade.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{DeviceQuery, HandlerContext, ProtocolResponse, RequestHandler};
use crate::model::{AttendanceEvent, AttendanceSession};
use crate::ring::{AckEntry, HandshakeEntry, HitEntry, PollEntry};
use crate::store::{EventStore, MemoryStore};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

/// The push server.
///
/// Single entry point for both sides of the subsystem: the terminal-facing
/// wire layer calls the `handle_*` methods, and the surrounding back-office
/// UI consumes the admin seam (recent events, sessions, command enqueue,
/// activity snapshots). All shared state lives in the [`HandlerContext`].
///
/// # Example
///
/// ```
/// use pushgate_server::{PushServer, ServerConfig};
///
/// let server = PushServer::new(ServerConfig::default());
/// server.enqueue_command("AAML1", "REBOOT");
/// assert_eq!(server.handle_getrequest("AAML1").into_body(), "C:1:REBOOT\n");
/// ```
pub struct PushServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl PushServer {
    /// Creates a push server over an in-memory store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Creates a push server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn EventStore>) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Handles a discovery poll (GET on the data endpoint).
    pub fn handle_cdata_get(&self, query: &DeviceQuery) -> ProtocolResponse {
        self.handler.handle_cdata_get(query)
    }

    /// Handles a data upload (POST on the data endpoint).
    pub fn handle_cdata_post(
        &self,
        query: &DeviceQuery,
        body: &str,
    ) -> ServerResult<ProtocolResponse> {
        self.handler.handle_cdata_post(query, body)
    }

    /// Handles a mailbox poll.
    pub fn handle_getrequest(&self, serial: &str) -> ProtocolResponse {
        self.handler.handle_getrequest(serial)
    }

    /// Handles an acknowledgement submission.
    pub fn handle_devicecmd(&self, serial: Option<&str>, body: &str) -> ProtocolResponse {
        self.handler.handle_devicecmd(serial, body)
    }

    // Admin seam, consumed by the surrounding back-office UI.

    /// Queues a command for a terminal's next mailbox poll.
    ///
    /// Returns `false` if a command was already pending for that serial.
    pub fn enqueue_command(&self, serial: &str, command: impl Into<String>) -> bool {
        let fresh = self.context.queue.enqueue(serial, command);
        info!(serial, fresh, "operator enqueued command");
        fresh
    }

    /// Recent events for a badge, newest first, capped at `limit`.
    pub fn recent_events(&self, badge_id: &str, limit: usize) -> ServerResult<Vec<AttendanceEvent>> {
        Ok(self.context.store.events_for_badge(badge_id, limit)?)
    }

    /// Sessions for a badge on a given date.
    pub fn sessions_on(
        &self,
        badge_id: &str,
        date: NaiveDate,
    ) -> ServerResult<Vec<AttendanceSession>> {
        Ok(self.context.store.sessions_on(badge_id, date)?)
    }

    /// Recent capability handshakes.
    pub fn recent_handshakes(&self) -> Vec<HandshakeEntry> {
        self.context.activity.recent_handshakes()
    }

    /// Recent raw punches.
    pub fn recent_hits(&self) -> Vec<HitEntry> {
        self.context.activity.recent_hits()
    }

    /// Recent mailbox polls.
    pub fn recent_polls(&self) -> Vec<PollEntry> {
        self.context.activity.recent_polls()
    }

    /// Recent acknowledgements.
    pub fn recent_acks(&self) -> Vec<AckEntry> {
        self.context.activity.recent_acks()
    }
}
