//! Server configuration.

use pushgate_protocol::HandshakeOptions;
use std::net::SocketAddr;

/// Configuration for the push server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Seconds a terminal waits before retrying after an error reply.
    pub error_delay_secs: u32,
    /// Seconds between routine terminal polls.
    pub poll_delay_secs: u32,
    /// Minutes between bulk data transfers.
    pub trans_interval_mins: u32,
    /// Server timezone offset in whole hours, echoed to terminals.
    pub timezone_offset_hours: i32,
    /// Whether terminals should push punches as they happen.
    pub realtime: bool,
    /// Push-protocol version string the server advertises.
    pub push_version: String,
    /// Capacity of each observability ring buffer.
    pub ring_capacity: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            error_delay_secs: 30,
            poll_delay_secs: 10,
            trans_interval_mins: 1,
            timezone_offset_hours: 0,
            realtime: true,
            push_version: "2.4.1".to_string(),
            ring_capacity: 50,
        }
    }

    /// Sets the timezone offset echoed in the handshake block.
    pub fn with_timezone_offset(mut self, hours: i32) -> Self {
        self.timezone_offset_hours = hours;
        self
    }

    /// Sets the advertised push-protocol version.
    pub fn with_push_version(mut self, version: impl Into<String>) -> Self {
        self.push_version = version.into();
        self
    }

    /// Sets the terminal poll delay.
    pub fn with_poll_delay(mut self, secs: u32) -> Self {
        self.poll_delay_secs = secs;
        self
    }

    /// Sets the realtime push flag.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Sets the ring buffer capacity.
    pub fn with_ring_capacity(mut self, capacity: usize) -> Self {
        self.ring_capacity = capacity;
        self
    }

    /// Builds the handshake option set this configuration negotiates.
    pub fn handshake_options(&self) -> HandshakeOptions {
        HandshakeOptions {
            error_delay_secs: self.error_delay_secs,
            poll_delay_secs: self.poll_delay_secs,
            trans_interval_mins: self.trans_interval_mins,
            timezone_offset_hours: self.timezone_offset_hours,
            realtime: self.realtime,
            push_version: self.push_version.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8081)))
    }
}
