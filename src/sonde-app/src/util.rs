// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

/// Uppercase a callsign and strip whitespace, keeping the `-SSID` suffix.
pub fn normalize_callsign(call: &str) -> String {
    call.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
