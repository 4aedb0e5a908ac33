// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! KISS / AX.25 / TNC2 plumbing between a TNC and [`sonde_core::RawFrame`].

pub mod ax25;
pub mod kiss;
pub mod tnc2;

pub use ax25::{encode_ui_frame, parse_ui_frame, Ax25Address, Ax25Error, Ax25Frame};
pub use kiss::{encode_kiss, KissDeframer, KissFrame};
pub use tnc2::{parse_tnc2, Tnc2Frame};
