// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::ops::RangeBounds;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("message does not match any known grammar")]
    NoMatch,

    #[error("{field} value {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },
}

/// How decoders treat numerically implausible fields.
///
/// Frames heard so far carry humidity above 100 % and minute fields of 60
/// or more now and then; `Lenient` passes them through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangePolicy {
    #[default]
    Lenient,
    /// Reject with [`DecodeError::OutOfRange`]
    Strict,
}

impl RangePolicy {
    pub(crate) fn check<R: RangeBounds<f64>>(
        self,
        field: &'static str,
        value: f64,
        range: R,
    ) -> Result<(), DecodeError> {
        if self == RangePolicy::Strict && !range.contains(&value) {
            return Err(DecodeError::OutOfRange { field, value });
        }
        Ok(())
    }
}
