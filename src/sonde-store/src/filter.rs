// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use chrono::{DateTime, Utc};

use sonde_core::frame::RawFrame;

/// Frame selection; unset fields match everything. Time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub destination: Option<String>,
}

impl FrameFilter {
    pub fn matches(&self, frame: &RawFrame) -> bool {
        self.start.map_or(true, |start| frame.received_at >= start)
            && self.end.map_or(true, |end| frame.received_at <= end)
            && self
                .source
                .as_deref()
                .map_or(true, |s| frame.source.eq_ignore_ascii_case(s))
            && self
                .destination
                .as_deref()
                .map_or(true, |d| frame.destination.eq_ignore_ascii_case(d))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameOrder {
    #[default]
    Ascending,
    Descending,
}

/// Stable sort by reception time.
pub(crate) fn sort_frames(frames: &mut [RawFrame], order: FrameOrder) {
    match order {
        FrameOrder::Ascending => frames.sort_by_key(|f| f.received_at),
        // Not `reverse()`: ties must stay in insertion order.
        FrameOrder::Descending => frames.sort_by(|a, b| b.received_at.cmp(&a.received_at)),
    }
}
