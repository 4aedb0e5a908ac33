// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Environmental telemetry decoding (temperature, humidity, pressure,
//! acceleration).
//!
//! The payload has been sent in two layouts over the flight campaigns:
//!
//! * fixed width: `t078h31b10148`, nothing after the pressure digits;
//! * legacy: `t077h36b9993 -1.06,-0.05,0.07`, variable digit runs followed by
//!   up to three acceleration components.
//!
//! Both may be preceded by other APRS fields (e.g. `_10151230c...s...g...`).
//! Layouts are tried in `GRAMMARS` order and the first match wins.

use chrono::{DateTime, Utc};
use sonde_core::decode::{TelemetryGrammar, TelemetryReading};

use crate::error::{DecodeError, RangePolicy};
use crate::scan::{digits_value, positions_of, Scanner};

const ACCEL_AXES: usize = 3;

/// One grammar attempt: returns the captured fields of the leftmost match.
type GrammarAttempt = fn(&str) -> Option<TelemetryFields>;

const GRAMMARS: &[(TelemetryGrammar, GrammarAttempt)] = &[
    (TelemetryGrammar::FixedWidth, match_fixed_width),
    (TelemetryGrammar::Legacy, match_legacy),
];

/// Raw values captured by a grammar, before unit conversion.
#[derive(Debug, Clone, PartialEq)]
struct TelemetryFields {
    temperature: f64,
    humidity: f64,
    pressure: f64,
    accel: Option<[f64; ACCEL_AXES]>,
}

impl TelemetryFields {
    fn into_reading(
        self,
        grammar: TelemetryGrammar,
        timestamp: DateTime<Utc>,
    ) -> TelemetryReading {
        TelemetryReading {
            timestamp,
            // The sensor digits are sent Fahrenheit-coded.
            temperature_c: (self.temperature - 32.0) * 5.0 / 9.0,
            humidity_pct: self.humidity,
            pressure_hpa: self.pressure / 10.0,
            accel_x: self.accel.map(|a| a[0]),
            accel_y: self.accel.map(|a| a[1]),
            accel_z: self.accel.map(|a| a[2]),
            grammar,
        }
    }
}

/// Decode a telemetry message, passing implausible values through.
pub fn decode_telemetry(
    message: &str,
    timestamp: DateTime<Utc>,
) -> Result<TelemetryReading, DecodeError> {
    decode_telemetry_with(message, timestamp, RangePolicy::Lenient)
}

pub fn decode_telemetry_with(
    message: &str,
    timestamp: DateTime<Utc>,
    policy: RangePolicy,
) -> Result<TelemetryReading, DecodeError> {
    let (grammar, fields) = GRAMMARS
        .iter()
        .find_map(|(grammar, attempt)| attempt(message).map(|fields| (*grammar, fields)))
        .ok_or(DecodeError::NoMatch)?;

    policy.check("humidity", fields.humidity, 0.0..=100.0)?;
    Ok(fields.into_reading(grammar, timestamp))
}

/// `t` digits `h` digits `b` digits, with any digit-run length.
///
/// Returns the three digit runs, leaving the scanner right after the
/// pressure digits.
pub(crate) fn scan_thb<'a>(s: &mut Scanner<'a>) -> Option<(&'a str, &'a str, &'a str)> {
    if !s.eat(b't') {
        return None;
    }
    let t = s.digits()?;
    if !s.eat(b'h') {
        return None;
    }
    let h = s.digits()?;
    if !s.eat(b'b') {
        return None;
    }
    let b = s.digits()?;
    Some((t, h, b))
}

/// `t\d{3}h\d{2}b\d{5}` with only whitespace after it.
fn match_fixed_width(message: &str) -> Option<TelemetryFields> {
    positions_of(message, b't').find_map(|start| {
        let mut s = Scanner::at(message, start);
        if !s.eat(b't') {
            return None;
        }
        let t = s.digits_exact(3)?;
        if !s.eat(b'h') {
            return None;
        }
        let h = s.digits_exact(2)?;
        if !s.eat(b'b') {
            return None;
        }
        let b = s.digits_exact(5)?;
        s.whitespace();
        if !s.is_at_end() {
            return None;
        }
        Some(TelemetryFields {
            temperature: digits_value(t),
            humidity: digits_value(h),
            pressure: digits_value(b),
            accel: None,
        })
    })
}

/// `t\d+h\d+b\d+`, whitespace, then an acceleration block.
fn match_legacy(message: &str) -> Option<TelemetryFields> {
    positions_of(message, b't').find_map(|start| {
        let mut s = Scanner::at(message, start);
        let (t, h, b) = scan_thb(&mut s)?;
        if s.whitespace() == 0 {
            return None;
        }
        let block = s.take_while(|c| {
            c.is_ascii_digit() || c.is_ascii_whitespace() || matches!(c, b'-' | b'+' | b',' | b'.')
        });
        let accel = parse_accel_block(block)?;
        Some(TelemetryFields {
            temperature: digits_value(t),
            humidity: digits_value(h),
            pressure: digits_value(b),
            accel: Some(accel),
        })
    })
}

/// Read up to three signed decimals; missing trailing axes are `0.0`.
///
/// Tokens are separated by whitespace or commas. A comma directly between
/// the integer digits and further digits of a token is a decimal comma, so
/// `-1.06,-0.05,0.07` reads as three tokens and `1,5 -2,25` as two.
fn parse_accel_block(block: &str) -> Option<[f64; ACCEL_AXES]> {
    let mut s = Scanner::new(block);
    let mut axes = [0.0; ACCEL_AXES];
    let mut count = 0;
    loop {
        while s.whitespace() > 0 || s.eat(b',') {}
        if s.is_at_end() {
            break;
        }
        let value = signed_decimal(&mut s)?;
        if count < ACCEL_AXES {
            axes[count] = value;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(axes)
}

fn signed_decimal(s: &mut Scanner<'_>) -> Option<f64> {
    let negative = s.one_of(b"+-") == Some(b'-');
    let int = s.digits()?;
    let mut text = String::from(int);
    if s.decimal_separator().is_some() {
        let frac = s.digits()?;
        text.push('.');
        text.push_str(frac);
    } else if s.peek() == Some(b'.') {
        // A dot that is not followed by a digit (`1.` or `1..2`).
        return None;
    }
    let value: f64 = text.parse().ok()?;
    Some(if negative { -value } else { value })
}
