// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use sonde_core::frame::FrameKind;

use crate::scan::{positions_of, Scanner};
use crate::telemetry::scan_thb;

/// Classify a message by shape only.
///
/// Position frames are recognised by their `!` data type identifier alone;
/// telemetry frames by a `t<digits>h<digits>b<digits>` run anywhere in the
/// text. Whether the frame actually decodes is left to the decoders.
pub fn classify(message: &str) -> FrameKind {
    if message.starts_with('!') {
        return FrameKind::Position;
    }
    let has_thb = positions_of(message, b't')
        .any(|start| scan_thb(&mut Scanner::at(message, start)).is_some());
    if has_thb {
        FrameKind::Telemetry
    } else {
        FrameKind::Unrecognized
    }
}
