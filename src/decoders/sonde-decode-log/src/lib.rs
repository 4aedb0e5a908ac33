// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Decoded-record file logging.
//!
//! Provides [`DecodeLogsConfig`] for TOML configuration and [`DecoderLoggers`]
//! for writing JSON-Lines log files with automatic daily rotation.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use sonde_core::decode::DecodedRecord;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn default_decode_logs_dir() -> String {
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir
            .join("sonde-rs")
            .join("decoded")
            .to_string_lossy()
            .to_string();
    }
    "logs/decoded".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLogsConfig {
    /// Whether decoded records are written to disk
    pub enabled: bool,
    /// Base directory for log files
    pub dir: String,
    /// Telemetry log filename (`%YYYY%`, `%MM%`, `%DD%` are expanded)
    pub telemetry_file: String,
    /// Position log filename
    pub position_file: String,
}

impl Default for DecodeLogsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_decode_logs_dir(),
            telemetry_file: "SONDE-TELEMETRY-%YYYY%-%MM%-%DD%.log".to_string(),
            position_file: "SONDE-POSITION-%YYYY%-%MM%-%DD%.log".to_string(),
        }
    }
}

fn resolve_file_name(template: &str, now: DateTime<Utc>) -> String {
    template
        .replace("%YYYY%", &now.format("%Y").to_string())
        .replace("%MM%", &now.format("%m").to_string())
        .replace("%DD%", &now.format("%d").to_string())
}

#[derive(Serialize)]
struct LogLine<'a, T: Serialize> {
    ts_ms: i64,
    decoder: &'static str,
    source: &'a str,
    payload: &'a T,
}

/// A JSONL file named by a date template. The file is opened on first
/// write and reopened whenever the resolved name changes.
struct RotatingLog {
    dir: PathBuf,
    template: String,
    kind: &'static str,
    current: Mutex<Option<OpenLog>>,
}

struct OpenLog {
    name: String,
    writer: BufWriter<File>,
}

impl RotatingLog {
    fn new(dir: &Path, template: &str, kind: &'static str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            template: template.to_string(),
            kind,
            current: Mutex::new(None),
        }
    }

    fn append<T: Serialize>(&self, now: DateTime<Utc>, source: &str, payload: &T) -> io::Result<()> {
        let name = resolve_file_name(&self.template, now);
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());

        if current.as_ref().map_or(true, |log| log.name != name) {
            if let Some(mut old) = current.take() {
                old.writer.flush()?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.dir.join(&name))?;
            *current = Some(OpenLog {
                name,
                writer: BufWriter::new(file),
            });
        }

        if let Some(log) = current.as_mut() {
            let line = LogLine {
                ts_ms: now.timestamp_millis(),
                decoder: self.kind,
                source,
                payload,
            };
            serde_json::to_writer(&mut log.writer, &line)?;
            log.writer.write_all(b"\n")?;
            log.writer.flush()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// One log file per record kind.
pub struct DecoderLoggers {
    telemetry: RotatingLog,
    position: RotatingLog,
}

impl DecoderLoggers {
    /// Create loggers from config, or return `None` when logging is disabled.
    pub fn from_config(cfg: &DecodeLogsConfig) -> Result<Option<Arc<Self>>, String> {
        if !cfg.enabled {
            return Ok(None);
        }

        let base_dir = PathBuf::from(cfg.dir.trim());
        create_dir_all(&base_dir)
            .map_err(|e| format!("create decode log dir '{}': {}", base_dir.display(), e))?;

        Ok(Some(Arc::new(Self {
            telemetry: RotatingLog::new(&base_dir, &cfg.telemetry_file, "telemetry"),
            position: RotatingLog::new(&base_dir, &cfg.position_file, "position"),
        })))
    }

    /// Append `record`, heard from `source`, to the file for its kind.
    pub fn log(&self, source: &str, record: &DecodedRecord) {
        self.log_at(Utc::now(), source, record);
    }

    fn log_at(&self, now: DateTime<Utc>, source: &str, record: &DecodedRecord) {
        let (log, result) = match record {
            DecodedRecord::Telemetry(reading) => {
                (&self.telemetry, self.telemetry.append(now, source, reading))
            }
            DecodedRecord::Position(fix) => (&self.position, self.position.append(now, source, fix)),
        };
        if let Err(e) = result {
            warn!("{} decode log write failed in {}: {}", log.kind, log.dir.display(), e);
        }
    }
}
