// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::RwLock;

use sonde_core::frame::RawFrame;

use crate::filter::{sort_frames, FrameFilter, FrameOrder};
use crate::{FrameStore, StoreError};

/// In-process store; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryFrameStore {
    frames: RwLock<Vec<RawFrame>>,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<RawFrame> for MemoryFrameStore {
    fn from_iter<I: IntoIterator<Item = RawFrame>>(iter: I) -> Self {
        Self {
            frames: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl FrameStore for MemoryFrameStore {
    fn append(&self, frame: &RawFrame) -> Result<(), StoreError> {
        let mut frames = self.frames.write().unwrap_or_else(|e| e.into_inner());
        frames.push(frame.clone());
        Ok(())
    }

    fn fetch(&self, filter: &FrameFilter, order: FrameOrder) -> Result<Vec<RawFrame>, StoreError> {
        let frames = self.frames.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<RawFrame> = frames.iter().filter(|f| filter.matches(f)).cloned().collect();
        sort_frames(&mut out, order);
        Ok(out)
    }

    fn len(&self) -> usize {
        self.frames.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_append_and_fetch() {
        let store = MemoryFrameStore::new();
        assert!(store.is_empty());
        let t0 = Utc.with_ymd_and_hms(2025, 5, 17, 9, 0, 0).unwrap();
        store
            .append(&RawFrame::new("B", "APLT", "second", t0 + chrono::Duration::minutes(1)))
            .unwrap();
        store.append(&RawFrame::new("A", "APLT", "first", t0)).unwrap();
        assert_eq!(store.len(), 2);

        let all = store
            .fetch(&FrameFilter::default(), FrameOrder::Ascending)
            .unwrap();
        assert_eq!(all[0].message, "first");

        let only_b = store
            .fetch(
                &FrameFilter {
                    source: Some("B".into()),
                    ..Default::default()
                },
                FrameOrder::Descending,
            )
            .unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].message, "second");
    }
}
