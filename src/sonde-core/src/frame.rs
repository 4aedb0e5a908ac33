// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Raw frames as received from the tracking network.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One text message heard on the radio network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrame {
    /// Sending station callsign (e.g. `F4KMN-11`)
    pub source: String,
    /// Destination callsign or APRS addressee
    pub destination: String,
    /// Payload text, without the TNC2 header
    pub message: String,
    /// Reception time at the ground station
    pub received_at: DateTime<Utc>,
}

impl RawFrame {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        message: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            message: message.into(),
            received_at,
        }
    }
}

/// Grammar family a message belongs to, derived from its text only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Telemetry,
    Position,
    Unrecognized,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Telemetry => "telemetry",
            FrameKind::Position => "position",
            FrameKind::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_frame_json_field_names() {
        let at = Utc.with_ymd_and_hms(2025, 5, 17, 9, 30, 0).unwrap();
        let frame = RawFrame::new("F4KMN-11", "APLT", "t078h31b10148", at);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["source"], "F4KMN-11");
        assert_eq!(json["destination"], "APLT");
        assert_eq!(json["message"], "t078h31b10148");
        assert_eq!(json["receivedAt"], "2025-05-17T09:30:00Z");
    }

    #[test]
    fn test_frame_kind_display() {
        assert_eq!(FrameKind::Telemetry.to_string(), "telemetry");
        assert_eq!(FrameKind::Position.to_string(), "position");
        assert_eq!(FrameKind::Unrecognized.to_string(), "unrecognized");
    }
}
