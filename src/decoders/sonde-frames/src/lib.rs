// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Balloon frame decoding: classification, telemetry and position grammars,
//! and order-preserving batch decoding.

pub mod batch;
pub mod classify;
pub mod error;
pub mod position;
mod scan;
pub mod telemetry;

pub use batch::{decode_all, decode_frame, BatchDecoder, BatchSummary};
pub use classify::classify;
pub use error::{DecodeError, RangePolicy};
pub use position::{decode_position, decode_position_with};
pub use telemetry::{decode_telemetry, decode_telemetry_with};
