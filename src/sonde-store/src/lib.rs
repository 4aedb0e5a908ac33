// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Persistence and chart queries for received frames.

pub mod filter;
pub mod memory;
pub mod pickle;
pub mod report;

use thiserror::Error;

use sonde_core::frame::RawFrame;

pub use filter::{FrameFilter, FrameOrder};
pub use memory::MemoryFrameStore;
pub use pickle::PickleFrameStore;
pub use report::{build_chart, Chart, CountRow, TrackPoint};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open frame store {0}: {1}")]
    Open(std::path::PathBuf, String),

    #[error("failed to write frame: {0}")]
    Write(String),

    #[error("failed to encode chart: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only frame storage.
pub trait FrameStore: Send + Sync {
    fn append(&self, frame: &RawFrame) -> Result<(), StoreError>;

    /// Frames matching `filter`, sorted by reception time. Frames received
    /// at the same instant keep their insertion order.
    fn fetch(&self, filter: &FrameFilter, order: FrameOrder) -> Result<Vec<RawFrame>, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
