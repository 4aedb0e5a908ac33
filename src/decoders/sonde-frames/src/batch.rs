// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Order-preserving batch decoding.
//!
//! Every frame is classified and handed to the matching decoder. Frames that
//! are unrecognized or fail to decode are dropped; a batch never fails as a
//! whole.

use std::ops::AddAssign;

use serde::Serialize;
use sonde_core::decode::DecodedRecord;
use sonde_core::frame::{FrameKind, RawFrame};
use tracing::{debug, warn};

use crate::classify::classify;
use crate::error::{DecodeError, RangePolicy};
use crate::position::decode_position_with;
use crate::telemetry::decode_telemetry_with;

/// Decode one frame with lenient range handling.
pub fn decode_frame(frame: &RawFrame) -> Result<DecodedRecord, DecodeError> {
    decode_as(frame, classify(&frame.message), RangePolicy::Lenient)
}

fn decode_as(
    frame: &RawFrame,
    kind: FrameKind,
    policy: RangePolicy,
) -> Result<DecodedRecord, DecodeError> {
    match kind {
        FrameKind::Telemetry => {
            decode_telemetry_with(&frame.message, frame.received_at, policy)
                .map(DecodedRecord::Telemetry)
        }
        FrameKind::Position => {
            decode_position_with(&frame.message, policy).map(DecodedRecord::Position)
        }
        FrameKind::Unrecognized => Err(DecodeError::NoMatch),
    }
}

/// Decode a batch sequentially with default options.
pub fn decode_all(frames: &[RawFrame]) -> Vec<DecodedRecord> {
    BatchDecoder::default().decode(frames)
}

/// What happened to the frames of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub decoded: usize,
    /// Frames whose message has no known shape
    pub unrecognized: usize,
    /// Frames that were classified but did not decode
    pub rejected: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.decoded + self.unrecognized + self.rejected
    }
}

impl AddAssign for BatchSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.decoded += rhs.decoded;
        self.unrecognized += rhs.unrecognized;
        self.rejected += rhs.rejected;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDecoder {
    policy: RangePolicy,
    workers: usize,
}

impl Default for BatchDecoder {
    fn default() -> Self {
        Self {
            policy: RangePolicy::Lenient,
            workers: 1,
        }
    }
}

impl BatchDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop frames with implausible humidity or minute fields.
    pub fn with_strict_ranges(mut self, strict: bool) -> Self {
        self.policy = if strict {
            RangePolicy::Strict
        } else {
            RangePolicy::Lenient
        };
        self
    }

    /// Number of threads used for one batch. `0` is treated as `1`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Decode a single frame with this decoder's range policy.
    pub fn decode_one(&self, frame: &RawFrame) -> Result<DecodedRecord, DecodeError> {
        decode_as(frame, classify(&frame.message), self.policy)
    }

    pub fn decode(&self, frames: &[RawFrame]) -> Vec<DecodedRecord> {
        self.decode_with_summary(frames).0
    }

    pub fn decode_with_summary(&self, frames: &[RawFrame]) -> (Vec<DecodedRecord>, BatchSummary) {
        let (records, summary) = if self.workers > 1 && frames.len() > self.workers {
            self.decode_parallel(frames)
        } else {
            self.decode_chunk(frames)
        };
        debug!(
            "Decoded {} of {} frames ({} unrecognized, {} rejected)",
            summary.decoded,
            summary.total(),
            summary.unrecognized,
            summary.rejected
        );
        (records, summary)
    }

    fn decode_chunk(&self, frames: &[RawFrame]) -> (Vec<DecodedRecord>, BatchSummary) {
        let mut records = Vec::with_capacity(frames.len());
        let mut summary = BatchSummary::default();
        for frame in frames {
            let kind = classify(&frame.message);
            if kind == FrameKind::Unrecognized {
                summary.unrecognized += 1;
                continue;
            }
            match decode_as(frame, kind, self.policy) {
                Ok(record) => {
                    summary.decoded += 1;
                    records.push(record);
                }
                Err(e) => {
                    debug!("Dropping frame from {}: {} ({:?})", frame.source, e, frame.message);
                    summary.rejected += 1;
                }
            }
        }
        (records, summary)
    }

    /// Split into contiguous chunks, decode each on its own thread and
    /// concatenate the results in chunk order.
    fn decode_parallel(&self, frames: &[RawFrame]) -> (Vec<DecodedRecord>, BatchSummary) {
        let chunk_len = frames.len().div_ceil(self.workers);
        let chunks: Vec<&[RawFrame]> = frames.chunks(chunk_len).collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = chunks
                .iter()
                .map(|chunk| scope.spawn(move || self.decode_chunk(chunk)))
                .collect();

            let mut records = Vec::with_capacity(frames.len());
            let mut summary = BatchSummary::default();
            for (chunk, handle) in chunks.iter().zip(handles) {
                let (part, part_summary) = handle.join().unwrap_or_else(|_| {
                    warn!("Decode worker panicked; decoding its chunk inline");
                    self.decode_chunk(chunk)
                });
                records.extend(part);
                summary += part_summary;
            }
            (records, summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn frame(i: i64, message: &str) -> RawFrame {
        let at = Utc.with_ymd_and_hms(2025, 5, 17, 9, 0, 0).unwrap() + Duration::seconds(i);
        RawFrame::new("F4KMN-11", "APLT", message, at)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_decode_frame_dispatches_by_kind() {
        let rec = decode_frame(&frame(0, "t078h31b10148")).unwrap();
        let reading = rec.as_telemetry().unwrap();
        assert!(approx(reading.pressure_hpa, 1014.8));
        assert_eq!(reading.timestamp, frame(0, "").received_at);

        let rec = decode_frame(&frame(1, "!4759.73N/00012.26E")).unwrap();
        assert!(approx(rec.as_position().unwrap().latitude, 47.9955));

        assert_eq!(decode_frame(&frame(2, "hello world")), Err(DecodeError::NoMatch));
    }

    #[test]
    fn test_unrecognized_only_batch_is_empty() {
        assert!(decode_all(&[frame(0, "hello world")]).is_empty());
        assert!(decode_all(&[]).is_empty());
    }

    #[test]
    fn test_malformed_middle_frame_is_dropped() {
        let frames = vec![
            frame(0, "t078h31b10148"),
            frame(1, "!47XX.73N/00012.26E"),
            frame(2, "!4759.73S/00012.26W"),
        ];
        let records = decode_all(&frames);
        assert_eq!(records.len(), 2);
        assert!(records[0].as_telemetry().is_some());
        assert!(approx(records[1].as_position().unwrap().latitude, -47.9955));
    }

    #[test]
    fn test_summary_counts() {
        let frames = vec![
            frame(0, "t078h31b10148"),
            frame(1, ":F4KMN    :hello{01"),
            frame(2, "!4759.73N/"),
            frame(3, "t077h36b9993 -1.06,-0.05,0.07"),
            frame(4, "t077h36b9993"),
        ];
        let (records, summary) = BatchDecoder::new().decode_with_summary(&frames);
        assert_eq!(records.len(), 2);
        assert_eq!(
            summary,
            BatchSummary {
                decoded: 2,
                unrecognized: 1,
                rejected: 2,
            }
        );
        assert_eq!(summary.total(), frames.len());
    }

    #[test]
    fn test_decode_one_uses_range_policy() {
        let hot = frame(0, "t078h120b10148 0 0 1");
        assert!(BatchDecoder::new().decode_one(&hot).is_ok());
        assert!(BatchDecoder::new()
            .with_strict_ranges(true)
            .decode_one(&hot)
            .is_err());
        assert_eq!(
            BatchDecoder::new().decode_one(&frame(1, "hello")),
            Err(DecodeError::NoMatch)
        );
    }

    #[test]
    fn test_strict_batch_drops_out_of_range() {
        let frames = vec![
            frame(0, "t078h31b10148"),
            frame(1, "t078h120b10148 0 0 1"),
            frame(2, "!4775.00N/00012.26E"),
        ];
        assert_eq!(decode_all(&frames).len(), 3);
        let (records, summary) = BatchDecoder::new()
            .with_strict_ranges(true)
            .decode_with_summary(&frames);
        assert_eq!(records.len(), 1);
        assert_eq!(summary.rejected, 2);
    }

    #[test]
    fn test_decoding_is_idempotent() {
        let frames = vec![
            frame(0, "t078h31b10148"),
            frame(1, "!4759.73N/00012.26E"),
            frame(2, "noise"),
        ];
        assert_eq!(decode_all(&frames), decode_all(&frames));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let messages = [
            "t078h31b10148",
            "!4759.73N/00012.26E",
            "garbage",
            "t077h36b9993 -1.06,-0.05,0.07",
            "!4759.73S/00012.26W",
            "t077h36b99",
            "t050h80b09870",
        ];
        let frames: Vec<RawFrame> = (0..103)
            .map(|i| frame(i, messages[i as usize % messages.len()]))
            .collect();

        let sequential = BatchDecoder::new().decode_with_summary(&frames);
        for workers in [0, 2, 3, 8, 200] {
            let parallel = BatchDecoder::new()
                .with_workers(workers)
                .decode_with_summary(&frames);
            assert_eq!(parallel, sequential, "workers={workers}");
        }
    }
}
