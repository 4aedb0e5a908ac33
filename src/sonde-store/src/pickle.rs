// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use pickledb::{PickleDb, PickleDbDumpPolicy, SerializationMethod};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use sonde_core::frame::RawFrame;

use crate::filter::{FrameFilter, FrameOrder};
use crate::{FrameStore, StoreError};

const KEY_PREFIX: &str = "frame:";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFrame {
    /// Insertion counter; breaks ties between equal reception times
    seq: u64,
    frame: RawFrame,
}

/// Frame store persisted to a JSON pickledb file.
pub struct PickleFrameStore {
    db: RwLock<PickleDb>,
    next_seq: AtomicU64,
}

impl PickleFrameStore {
    /// Open (or create) the store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Open(path.to_path_buf(), e.to_string()))?;
            }
        }
        let db = if path.exists() {
            PickleDb::load(path, PickleDbDumpPolicy::AutoDump, SerializationMethod::Json)
                .map_err(|e| StoreError::Open(path.to_path_buf(), e.to_string()))?
        } else {
            PickleDb::new(path, PickleDbDumpPolicy::AutoDump, SerializationMethod::Json)
        };

        let next_seq = stored_frames(&db)
            .map(|stored| stored.seq + 1)
            .max()
            .unwrap_or(0);
        debug!(
            "Opened frame store {} ({} frames)",
            path.display(),
            db.total_keys()
        );
        Ok(Self {
            db: RwLock::new(db),
            next_seq: AtomicU64::new(next_seq),
        })
    }

    /// Returns the platform default path: `<data_dir>/sonde-rs/frames.db`.
    /// Falls back to `./frames.db` when the data dir is unavailable.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("sonde-rs").join("frames.db"))
            .unwrap_or_else(|| PathBuf::from("frames.db"))
    }
}

fn frame_key(frame: &RawFrame) -> String {
    format!(
        "{KEY_PREFIX}{:020}:{}",
        frame.received_at.timestamp_millis(),
        Uuid::new_v4()
    )
}

fn stored_frames(db: &PickleDb) -> impl Iterator<Item = StoredFrame> + '_ {
    db.iter().filter_map(|kv| {
        if !kv.get_key().starts_with(KEY_PREFIX) {
            return None;
        }
        let stored = kv.get_value::<StoredFrame>();
        if stored.is_none() {
            warn!("Skipping unreadable frame store entry {}", kv.get_key());
        }
        stored
    })
}

impl FrameStore for PickleFrameStore {
    fn append(&self, frame: &RawFrame) -> Result<(), StoreError> {
        // Sequence numbers follow write-lock order.
        let mut db = self.db.write().unwrap_or_else(|e| e.into_inner());
        let stored = StoredFrame {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            frame: frame.clone(),
        };
        db.set(&frame_key(frame), &stored)
            .map_err(|e| StoreError::Write(e.to_string()))
    }

    fn fetch(&self, filter: &FrameFilter, order: FrameOrder) -> Result<Vec<RawFrame>, StoreError> {
        let db = self.db.read().unwrap_or_else(|e| e.into_inner());
        let mut matching: Vec<StoredFrame> = stored_frames(&db)
            .filter(|stored| filter.matches(&stored.frame))
            .collect();
        matching.sort_by(|a, b| {
            let by_time = a.frame.received_at.cmp(&b.frame.received_at);
            let by_time = match order {
                FrameOrder::Ascending => by_time,
                FrameOrder::Descending => by_time.reverse(),
            };
            by_time.then(a.seq.cmp(&b.seq))
        });
        Ok(matching.into_iter().map(|stored| stored.frame).collect())
    }

    fn len(&self) -> usize {
        let db = self.db.read().unwrap_or_else(|e| e.into_inner());
        db.get_all()
            .iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .count()
    }
}
