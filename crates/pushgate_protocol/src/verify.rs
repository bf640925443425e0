//! Verification method codes.

use serde::Serialize;
use std::fmt;

/// How a terminal verified the person behind a punch.
///
/// Terminals report a small integer; the mapping below is fixed and codes
/// outside it collapse to [`VerifyMethod::Unknown`] rather than being
/// rejected, since firmware revisions add codes faster than servers learn
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMethod {
    /// Fingerprint match on the sensor.
    Fingerprint,
    /// Numeric password on the keypad.
    Password,
    /// RFID/proximity card.
    RfidCard,
    /// Face recognition.
    Face,
    /// Palm vein recognition.
    Palm,
    /// Any code not in the fixed table.
    Unknown,
}

impl VerifyMethod {
    /// Maps a terminal-reported code to a method.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => VerifyMethod::Fingerprint,
            3 => VerifyMethod::Password,
            4 => VerifyMethod::RfidCard,
            15 => VerifyMethod::Face,
            16 => VerifyMethod::Palm,
            _ => VerifyMethod::Unknown,
        }
    }

    /// Returns the lowercase display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyMethod::Fingerprint => "fingerprint",
            VerifyMethod::Password => "password",
            VerifyMethod::RfidCard => "rfid_card",
            VerifyMethod::Face => "face",
            VerifyMethod::Palm => "palm",
            VerifyMethod::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VerifyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
