// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Uncompressed APRS position decoding: `!DDMM.mmN/DDDMM.mmE...`.

use sonde_core::decode::GeoFix;

use crate::error::{DecodeError, RangePolicy};
use crate::scan::{digits_value, Scanner};

/// Degrees and minutes of one axis as sent on air.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coordinate {
    degrees: f64,
    minutes: f64,
    negative: bool,
}

impl Coordinate {
    fn decimal_degrees(&self) -> f64 {
        let value = self.degrees + self.minutes / 60.0;
        if self.negative {
            -value
        } else {
            value
        }
    }
}

/// Decode a position message, passing out-of-range minutes through.
pub fn decode_position(message: &str) -> Result<GeoFix, DecodeError> {
    decode_position_with(message, RangePolicy::Lenient)
}

pub fn decode_position_with(message: &str, policy: RangePolicy) -> Result<GeoFix, DecodeError> {
    let mut s = Scanner::new(message);
    if !s.eat(b'!') {
        return Err(DecodeError::NoMatch);
    }
    let lat = scan_coordinate(&mut s, 2, b'N', b'S').ok_or(DecodeError::NoMatch)?;
    if !s.eat(b'/') {
        return Err(DecodeError::NoMatch);
    }
    let lon = scan_coordinate(&mut s, 3, b'E', b'W').ok_or(DecodeError::NoMatch)?;
    // Symbol code, course/speed, comment etc. are not used.

    policy.check("latitude minutes", lat.minutes, 0.0..60.0)?;
    policy.check("longitude minutes", lon.minutes, 0.0..60.0)?;
    let fix = GeoFix {
        latitude: lat.decimal_degrees(),
        longitude: lon.decimal_degrees(),
    };
    policy.check("latitude", fix.latitude, -90.0..=90.0)?;
    policy.check("longitude", fix.longitude, -180.0..=180.0)?;
    Ok(fix)
}

/// `D{deg_width} MM . m+ hemisphere`
fn scan_coordinate(
    s: &mut Scanner<'_>,
    deg_width: usize,
    positive: u8,
    negative: u8,
) -> Option<Coordinate> {
    let degrees = digits_value(s.digits_exact(deg_width)?);
    let whole = s.digits_exact(2)?;
    if !s.eat(b'.') {
        return None;
    }
    let frac = s.digits()?;
    let minutes: f64 = format!("{whole}.{frac}").parse().ok()?;
    let hemisphere = s.one_of(&[positive, negative])?;
    Some(Coordinate {
        degrees,
        minutes,
        negative: hemisphere == negative,
    })
}
