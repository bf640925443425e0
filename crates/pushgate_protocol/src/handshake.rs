//! Capability handshake option block.

use std::fmt::Write;

/// A terminal's capability-discovery poll.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeRequest {
    /// Terminal serial number.
    pub serial: String,
    /// Push-protocol version advertised by the terminal. Absent on legacy
    /// firmware that only sends `options=all`.
    pub push_version: Option<String>,
}

impl HandshakeRequest {
    /// Creates a new handshake request.
    pub fn new(serial: impl Into<String>, push_version: Option<String>) -> Self {
        Self {
            serial: serial.into(),
            push_version,
        }
    }
}

/// Server-side parameters rendered into the negotiated option block.
///
/// Rendering is a pure function of these values plus the inbound serial
/// number; answering the same poll twice yields byte-identical output, which
/// matters because terminals retry the handshake on their own short timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeOptions {
    /// Seconds a terminal waits before retrying after an error reply.
    pub error_delay_secs: u32,
    /// Seconds between routine discovery polls.
    pub poll_delay_secs: u32,
    /// Minutes between bulk data transfers.
    pub trans_interval_mins: u32,
    /// Server timezone offset in whole hours.
    pub timezone_offset_hours: i32,
    /// Whether the terminal should push events as they happen rather than
    /// batching on the transfer interval.
    pub realtime: bool,
    /// Push-protocol version the server speaks. Sent as-is; the device's
    /// advertised version is never negotiated down.
    pub push_version: String,
}

impl HandshakeOptions {
    /// Renders the multi-line option block for one terminal.
    ///
    /// The block always requests AttLog data only and ends with a trailing
    /// newline, as firmware expects.
    pub fn render(&self, serial: &str) -> String {
        let mut block = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(block, "GET OPTION FROM: {serial}");
        let _ = writeln!(block, "ErrorDelay={}", self.error_delay_secs);
        let _ = writeln!(block, "Delay={}", self.poll_delay_secs);
        let _ = writeln!(block, "TransInterval={}", self.trans_interval_mins);
        let _ = writeln!(block, "TransFlag=AttLog");
        let _ = writeln!(block, "TimeZone={}", self.timezone_offset_hours);
        let _ = writeln!(block, "Realtime={}", u8::from(self.realtime));
        let _ = writeln!(block, "PushProtVer={}", self.push_version);
        block
    }
}

impl Default for HandshakeOptions {
    fn default() -> Self {
        Self {
            error_delay_secs: 30,
            poll_delay_secs: 10,
            trans_interval_mins: 1,
            timezone_offset_hours: 0,
            realtime: true,
            push_version: "2.4.1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_block() {
        let options = HandshakeOptions {
            timezone_offset_hours: 2,
            ..HandshakeOptions::default()
        };
        let block = options.render("AAML1");

        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "GET OPTION FROM: AAML1");
        assert_eq!(lines[1], "ErrorDelay=30");
        assert_eq!(lines[2], "Delay=10");
        assert_eq!(lines[3], "TransInterval=1");
        assert_eq!(lines[4], "TransFlag=AttLog");
        assert_eq!(lines[5], "TimeZone=2");
        assert_eq!(lines[6], "Realtime=1");
        assert_eq!(lines[7], "PushProtVer=2.4.1");
        assert!(block.ends_with('\n'));
    }

    #[test]
    fn render_is_idempotent() {
        let options = HandshakeOptions::default();
        assert_eq!(options.render("X1"), options.render("X1"));
    }

    #[test]
    fn realtime_flag_rendering() {
        let options = HandshakeOptions {
            realtime: false,
            ..HandshakeOptions::default()
        };
        assert!(options.render("X1").contains("Realtime=0\n"));
    }
}
