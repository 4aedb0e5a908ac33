// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Frame intake shared by the listeners, the serial port and file imports.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use sonde_ax25::{parse_tnc2, parse_ui_frame, KissDeframer, KissFrame, Tnc2Frame};
use sonde_core::decode::DecodedRecord;
use sonde_core::frame::RawFrame;
use sonde_core::DynResult;
use sonde_decode_log::DecoderLoggers;
use sonde_frames::{BatchDecoder, BatchSummary};
use sonde_store::{FrameStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportFormat {
    /// One TNC2 monitor line per frame, optionally prefixed by an RFC 3339 time
    Tnc2,
    /// Raw KISS capture
    Kiss,
    /// One JSON-encoded frame per line
    Jsonl,
}

/// Store, decode and log incoming frames.
pub struct Ingest {
    store: Arc<dyn FrameStore>,
    decoder: BatchDecoder,
    loggers: Option<Arc<DecoderLoggers>>,
    uplink: Option<broadcast::Sender<Tnc2Frame>>,
}

impl Ingest {
    pub fn new(
        store: Arc<dyn FrameStore>,
        decoder: BatchDecoder,
        loggers: Option<Arc<DecoderLoggers>>,
    ) -> Self {
        Self {
            store,
            decoder,
            loggers,
            uplink: None,
        }
    }

    /// Also publish frames heard on RF to `uplink` (the APRS-IS IGate).
    pub fn with_uplink(mut self, uplink: broadcast::Sender<Tnc2Frame>) -> Self {
        self.uplink = Some(uplink);
        self
    }

    /// Accept a frame heard on the radio, offering it to the uplink first.
    pub fn accept_rf(
        &self,
        tnc2: Tnc2Frame,
        received_at: DateTime<Utc>,
    ) -> Result<Option<DecodedRecord>, StoreError> {
        if let Some(uplink) = &self.uplink {
            if uplink.send(tnc2.clone()).is_err() {
                debug!("No APRS-IS uplink subscribed, frame not gated");
            }
        }
        self.accept(tnc2.into_raw_frame(received_at))
    }

    /// Persist one live frame and return its decoded record, if any.
    pub fn accept(&self, frame: RawFrame) -> Result<Option<DecodedRecord>, StoreError> {
        self.store.append(&frame)?;
        let record = self.decoder.decode_one(&frame).ok();
        match &record {
            Some(DecodedRecord::Telemetry(t)) => info!(
                "Telemetry from {}: {:.1} C, {:.0} %, {:.1} hPa",
                frame.source, t.temperature_c, t.humidity_pct, t.pressure_hpa
            ),
            Some(DecodedRecord::Position(p)) => info!(
                "Position from {}: {:.5}, {:.5}",
                frame.source, p.latitude, p.longitude
            ),
            None => debug!("Stored undecoded frame from {}: {}", frame.source, frame.message),
        }
        if let (Some(loggers), Some(record)) = (&self.loggers, &record) {
            loggers.log(&frame.source, record);
        }
        Ok(record)
    }

    /// Persist a batch of historic frames and decode it in one pass.
    pub fn import(&self, frames: &[RawFrame]) -> Result<BatchSummary, StoreError> {
        for frame in frames {
            self.store.append(frame)?;
        }
        let (_, summary) = self.decoder.decode_with_summary(frames);
        Ok(summary)
    }
}

/// Convert a KISS data frame into a raw frame received at `now`.
pub fn kiss_to_raw_frame(frame: &KissFrame, now: DateTime<Utc>) -> Option<RawFrame> {
    kiss_to_tnc2(frame).map(|tnc2| tnc2.into_raw_frame(now))
}

/// Convert a KISS data frame into its TNC2 form.
pub fn kiss_to_tnc2(frame: &KissFrame) -> Option<Tnc2Frame> {
    if !frame.is_data() {
        debug!("Ignoring KISS command 0x{:02x}", frame.command);
        return None;
    }
    let ax25 = match parse_ui_frame(&frame.payload) {
        Ok(ax25) => ax25,
        Err(e) => {
            warn!("Bad AX.25 frame on KISS port {}: {}", frame.port, e);
            return None;
        }
    };
    parse_tnc2(&ax25.to_tnc2())
}

/// Convert one TNC2 line, with an optional leading RFC 3339 timestamp.
pub fn tnc2_line_to_raw_frame(line: &str, now: DateTime<Utc>) -> Option<RawFrame> {
    let line = line.trim();
    let (received_at, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => match DateTime::parse_from_rfc3339(head) {
            Ok(ts) => (ts.with_timezone(&Utc), rest.trim_start()),
            Err(_) => (now, line),
        },
        None => (now, line),
    };
    parse_tnc2(rest).map(|tnc2| tnc2.into_raw_frame(received_at))
}

/// Parse an import file. Returns the frames and the number of skipped entries.
pub fn parse_import(
    content: &[u8],
    format: ImportFormat,
    now: DateTime<Utc>,
) -> (Vec<RawFrame>, usize) {
    let mut frames = Vec::new();
    let mut skipped = 0;
    match format {
        ImportFormat::Tnc2 => {
            for line in String::from_utf8_lossy(content).lines() {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                match tnc2_line_to_raw_frame(trimmed, now) {
                    Some(frame) => frames.push(frame),
                    None => skipped += 1,
                }
            }
        }
        ImportFormat::Kiss => {
            for kiss in KissDeframer::new().push(content) {
                match kiss_to_raw_frame(&kiss, now) {
                    Some(frame) => frames.push(frame),
                    None => skipped += 1,
                }
            }
        }
        ImportFormat::Jsonl => {
            for line in String::from_utf8_lossy(content).lines() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<RawFrame>(line) {
                    Ok(frame) => frames.push(frame),
                    Err(e) => {
                        debug!("Skipping JSON line: {}", e);
                        skipped += 1;
                    }
                }
            }
        }
    }
    (frames, skipped)
}

/// Read, store and decode an import file.
pub fn import_file(ingest: &Ingest, path: &Path, format: ImportFormat) -> DynResult<BatchSummary> {
    let content = std::fs::read(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let (frames, skipped) = parse_import(&content, format, Utc::now());
    if skipped > 0 {
        warn!("Skipped {} unreadable entries in {}", skipped, path.display());
    }
    let summary = ingest.import(&frames)?;
    info!(
        "Imported {} frames from {} ({} decoded, {} unrecognized, {} rejected)",
        frames.len(),
        path.display(),
        summary.decoded,
        summary.unrecognized,
        summary.rejected
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sonde_ax25::{encode_kiss, encode_ui_frame};
    use sonde_store::{FrameFilter, FrameOrder, MemoryFrameStore};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 17, 12, 0, 0).unwrap()
    }

    fn ingest(store: Arc<MemoryFrameStore>) -> Ingest {
        Ingest::new(store, BatchDecoder::new(), None)
    }

    #[test]
    fn test_accept_stores_and_decodes() {
        let store = Arc::new(MemoryFrameStore::new());
        let ingest = ingest(store.clone());

        let record = ingest
            .accept(RawFrame::new("F4KMN-11", "APLT", "t078h31b10148", now()))
            .unwrap();
        assert!(record.unwrap().as_telemetry().is_some());

        let record = ingest
            .accept(RawFrame::new("F4KMN-11", "APLT", "hello", now()))
            .unwrap();
        assert!(record.is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_rf_frames_are_offered_to_the_uplink() {
        let store = Arc::new(MemoryFrameStore::new());
        let (tx, mut rx) = broadcast::channel(4);
        let ingest = ingest(store.clone()).with_uplink(tx);

        let ax25 = encode_ui_frame("F4KMN-11", "APLT", &["WIDE1-1*"], b"t078h31b10148").unwrap();
        let kiss = KissDeframer::new().push(&encode_kiss(0, &ax25)).remove(0);
        let tnc2 = kiss_to_tnc2(&kiss).unwrap();
        let record = ingest.accept_rf(tnc2, now()).unwrap();
        assert!(record.unwrap().as_telemetry().is_some());

        let gated = rx.try_recv().unwrap();
        assert_eq!(gated.to_string(), "F4KMN-11>APLT,WIDE1-1*:t078h31b10148");
        assert_eq!(store.len(), 1);

        // Frames from the TNC2 listener are stored but not gated.
        ingest
            .accept(RawFrame::new("F4ABC", "APRS", "hello", now()))
            .unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_tnc2_line_with_and_without_timestamp() {
        let frame =
            tnc2_line_to_raw_frame("2025-05-17T09:30:00Z F4KMN-11>APLT:t078h31b10148", now())
                .unwrap();
        assert_eq!(
            frame.received_at,
            Utc.with_ymd_and_hms(2025, 5, 17, 9, 30, 0).unwrap()
        );
        assert_eq!(frame.message, "t078h31b10148");

        let frame = tnc2_line_to_raw_frame("F4KMN-11>APLT: t077h36b9993 -1.06,-0.05,0.07", now())
            .unwrap();
        assert_eq!(frame.received_at, now());
        assert_eq!(frame.message, "t077h36b9993 -1.06,-0.05,0.07");

        assert!(tnc2_line_to_raw_frame("garbage", now()).is_none());
    }

    #[test]
    fn test_parse_import_tnc2() {
        let content = b"# capture\nF4KMN-11>APLT:t078h31b10148\n\nnot a frame\nF4KMN-11>APLT::BALLON1 :!4759.73N/00012.26E\n";
        let (frames, skipped) = parse_import(content, ImportFormat::Tnc2, now());
        assert_eq!(frames.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(frames[1].destination, "BALLON1");
        assert_eq!(frames[1].message, "!4759.73N/00012.26E");
    }

    #[test]
    fn test_parse_import_kiss() {
        let mut content = Vec::new();
        for info in [&b"t078h31b10148"[..], &b"!4759.73N/00012.26E"[..]] {
            let ax25 = encode_ui_frame("F4KMN-11", "APLT", &["WIDE1-1"], info).unwrap();
            content.extend(encode_kiss(0, &ax25));
        }
        // A command frame and a truncated AX.25 frame are skipped.
        content.extend([0xC0, 0x01, 0x32, 0xC0]);
        content.extend(encode_kiss(0, b"short"));

        let (frames, skipped) = parse_import(&content, ImportFormat::Kiss, now());
        assert_eq!(skipped, 2);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].source, "F4KMN-11");
        assert_eq!(frames[0].destination, "APLT");
        assert_eq!(frames[1].message, "!4759.73N/00012.26E");
    }

    #[test]
    fn test_parse_import_jsonl() {
        let frame = RawFrame::new("F4KMN-11", "APLT", "t078h31b10148", now());
        let content = format!("{}\n{{broken\n", serde_json::to_string(&frame).unwrap());
        let (frames, skipped) = parse_import(content.as_bytes(), ImportFormat::Jsonl, now());
        assert_eq!(frames, vec![frame]);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_import_file_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.txt");
        std::fs::write(
            &path,
            "F4KMN-11>APLT:t078h31b10148\nF4KMN-11>APLT:hello\nF4KMN-11>APLT:!47XX.73N/00012.26E\n",
        )
        .unwrap();

        let store = Arc::new(MemoryFrameStore::new());
        let ingest = ingest(store.clone());
        let summary = import_file(&ingest, &path, ImportFormat::Tnc2).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                decoded: 1,
                unrecognized: 1,
                rejected: 1,
            }
        );
        let stored = store
            .fetch(&FrameFilter::default(), FrameOrder::Ascending)
            .unwrap();
        assert_eq!(stored.len(), 3);

        assert!(import_file(&ingest, &dir.path().join("missing"), ImportFormat::Tnc2).is_err());
    }
}
