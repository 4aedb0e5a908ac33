// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! TNC2 monitor lines: `SRC>DEST,PATH1,PATH2:payload`.

use std::fmt;

use chrono::{DateTime, Utc};
use sonde_core::frame::RawFrame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tnc2Frame {
    pub source: String,
    pub destination: String,
    pub path: Vec<String>,
    pub payload: String,
}

/// Split a TNC2 line at the first `>` and the first `:` after it.
///
/// Returns `None` when either separator is missing or the source or
/// destination is empty.
pub fn parse_tnc2(line: &str) -> Option<Tnc2Frame> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (source, rest) = line.split_once('>')?;
    let (header, payload) = rest.split_once(':')?;
    let mut calls = header.split(',').map(str::trim);
    let destination = calls.next()?;
    let source = source.trim();
    if source.is_empty() || destination.is_empty() {
        return None;
    }
    Some(Tnc2Frame {
        source: source.to_string(),
        destination: destination.to_string(),
        path: calls.filter(|c| !c.is_empty()).map(str::to_string).collect(),
        payload: payload.to_string(),
    })
}

impl Tnc2Frame {
    /// Destination and message text as stored for this frame.
    ///
    /// APRS messages (`SRC>DEST::ADDRESSEE:text`) are attributed to their
    /// addressee.
    pub fn message(&self) -> (String, String) {
        if let Some(body) = self.payload.strip_prefix(':') {
            if let Some((addressee, text)) = body.split_once(':') {
                return (addressee.trim().to_string(), text.trim().to_string());
            }
        }
        (self.destination.clone(), self.payload.trim().to_string())
    }

    pub fn into_raw_frame(self, received_at: DateTime<Utc>) -> RawFrame {
        let (destination, message) = self.message();
        RawFrame {
            source: self.source,
            destination,
            message,
            received_at,
        }
    }
}

impl fmt::Display for Tnc2Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}>{}", self.source, self.destination)?;
        for hop in &self.path {
            write!(f, ",{}", hop)?;
        }
        write!(f, ":{}", self.payload)
    }
}
