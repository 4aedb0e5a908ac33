// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod decode;
pub mod frame;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use decode::{DecodedRecord, GeoFix, TelemetryGrammar, TelemetryReading};
pub use frame::{FrameKind, RawFrame};
