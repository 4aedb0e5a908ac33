// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! KISS framing as spoken by serial and TCP TNCs.

use tracing::warn;

const FEND: u8 = 0xC0;
const FESC: u8 = 0xDB;
const TFEND: u8 = 0xDC;
const TFESC: u8 = 0xDD;

/// Frames longer than this are discarded (a lost FEND on a noisy line).
const MAX_FRAME_LEN: usize = 2048;

/// One KISS frame with its type byte split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KissFrame {
    pub port: u8,
    pub command: u8,
    pub payload: Vec<u8>,
}

impl KissFrame {
    /// Data frames carry an AX.25 frame; everything else is TNC control.
    pub fn is_data(&self) -> bool {
        self.command == 0
    }
}

/// Streaming KISS deframer; input may be split at any byte.
#[derive(Debug, Default)]
pub struct KissDeframer {
    buf: Vec<u8>,
    in_frame: bool,
    escape: bool,
}

impl KissDeframer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) -> Vec<KissFrame> {
        let mut frames = Vec::new();
        for &b in data {
            if b == FEND {
                if let Some(frame) = self.finish() {
                    frames.push(frame);
                }
                self.in_frame = true;
                continue;
            }
            if !self.in_frame {
                continue;
            }
            if self.escape {
                self.escape = false;
                self.buf.push(match b {
                    TFEND => FEND,
                    TFESC => FESC,
                    other => other,
                });
            } else if b == FESC {
                self.escape = true;
            } else {
                self.buf.push(b);
            }
            if self.buf.len() > MAX_FRAME_LEN {
                warn!("KISS frame exceeds {} bytes, discarding", MAX_FRAME_LEN);
                self.reset();
            }
        }
        frames
    }

    pub fn reset(&mut self) {
        self.buf.clear();
        self.in_frame = false;
        self.escape = false;
    }

    fn finish(&mut self) -> Option<KissFrame> {
        self.escape = false;
        if self.buf.is_empty() {
            return None;
        }
        let type_byte = self.buf[0];
        let payload = self.buf.split_off(1);
        self.buf.clear();
        Some(KissFrame {
            port: type_byte >> 4,
            command: type_byte & 0x0F,
            payload,
        })
    }
}

/// Wrap `payload` as a KISS data frame on `port`.
pub fn encode_kiss(port: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.push(FEND);
    out.push((port & 0x0F) << 4);
    for &b in payload {
        match b {
            FEND => out.extend_from_slice(&[FESC, TFEND]),
            FESC => out.extend_from_slice(&[FESC, TFESC]),
            other => out.push(other),
        }
    }
    out.push(FEND);
    out
}
