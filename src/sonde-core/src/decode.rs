// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Shared types for decoded balloon records (telemetry, position).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record produced by decoding one raw frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DecodedRecord {
    #[serde(rename = "telemetry")]
    Telemetry(TelemetryReading),
    #[serde(rename = "position")]
    Position(GeoFix),
}

impl DecodedRecord {
    pub fn as_telemetry(&self) -> Option<&TelemetryReading> {
        match self {
            DecodedRecord::Telemetry(reading) => Some(reading),
            DecodedRecord::Position(_) => None,
        }
    }

    pub fn as_position(&self) -> Option<&GeoFix> {
        match self {
            DecodedRecord::Position(fix) => Some(fix),
            DecodedRecord::Telemetry(_) => None,
        }
    }
}

/// Telemetry frame layout the reading was decoded from.
///
/// The on-air format changed over the flight campaigns; both layouts are
/// still heard and are decoded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryGrammar {
    /// `tTTThHHbBBBBB`, no acceleration block
    FixedWidth,
    /// `tT+hH+bB+` followed by an acceleration block
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    /// Reception time of the carrying frame
    pub timestamp: DateTime<Utc>,
    /// Temperature in degrees Celsius
    pub temperature_c: f64,
    /// Relative humidity in percent
    pub humidity_pct: f64,
    /// Barometric pressure in hectopascal
    #[serde(rename = "pressureHPa")]
    pub pressure_hpa: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accel_z: Option<f64>,
    pub grammar: TelemetryGrammar,
}

impl TelemetryReading {
    pub fn has_acceleration(&self) -> bool {
        self.accel_x.is_some() || self.accel_y.is_some() || self.accel_z.is_some()
    }
}

/// A position fix in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(accel: Option<(f64, f64, f64)>) -> TelemetryReading {
        TelemetryReading {
            timestamp: Utc.with_ymd_and_hms(2025, 5, 17, 9, 30, 0).unwrap(),
            temperature_c: 25.0,
            humidity_pct: 36.0,
            pressure_hpa: 999.3,
            accel_x: accel.map(|a| a.0),
            accel_y: accel.map(|a| a.1),
            accel_z: accel.map(|a| a.2),
            grammar: if accel.is_some() {
                TelemetryGrammar::Legacy
            } else {
                TelemetryGrammar::FixedWidth
            },
        }
    }

    #[test]
    fn test_telemetry_json_uses_chart_field_names() {
        let json = serde_json::to_value(DecodedRecord::Telemetry(reading(None))).unwrap();
        assert_eq!(json["type"], "telemetry");
        assert_eq!(json["temperatureC"], 25.0);
        assert_eq!(json["humidityPct"], 36.0);
        assert_eq!(json["pressureHPa"], 999.3);
        assert_eq!(json["grammar"], "fixed_width");
        assert!(json.get("accelX").is_none());
    }

    #[test]
    fn test_legacy_reading_serializes_acceleration() {
        let json =
            serde_json::to_value(DecodedRecord::Telemetry(reading(Some((-1.06, -0.05, 0.07)))))
                .unwrap();
        assert_eq!(json["accelX"], -1.06);
        assert_eq!(json["accelY"], -0.05);
        assert_eq!(json["accelZ"], 0.07);
        assert_eq!(json["grammar"], "legacy");
    }

    #[test]
    fn test_position_json() {
        let record = DecodedRecord::Position(GeoFix {
            latitude: 47.5,
            longitude: -0.25,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "position");
        assert_eq!(json["latitude"], 47.5);
        assert_eq!(json["longitude"], -0.25);
        assert!(record.as_telemetry().is_none());
        assert!(record.as_position().is_some());
    }
}
