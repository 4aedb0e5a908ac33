// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! AX.25 UI frame decoding and encoding.

use std::fmt;

use thiserror::Error;

const ADDR_LEN: usize = 7;
const MAX_DIGIPEATERS: usize = 8;
const CONTROL_UI: u8 = 0x03;
const PID_NO_LAYER3: u8 = 0xF0;
const SSID_RESERVED_BITS: u8 = 0x60;
const HAS_BEEN_REPEATED: u8 = 0x80;
const DEFAULT_DEST: &str = "APRS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ax25Error {
    #[error("frame too short ({0} bytes)")]
    TooShort(usize),

    #[error("address field not terminated after {0} digipeaters")]
    TooManyDigipeaters(usize),

    #[error("missing control/PID bytes")]
    MissingControl,

    #[error("not a UI frame (control 0x{0:02x})")]
    NotUiFrame(u8),

    #[error("invalid callsign '{0}'")]
    InvalidAddress(String),
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Address {
    pub call: String,
    pub ssid: u8,
    /// H bit; only meaningful on digipeater fields.
    pub repeated: bool,
}

impl Ax25Address {
    /// Parse `CALL` or `CALL-SSID` (SSID 0..=15, callsign up to 6 chars).
    /// A trailing `*` marks a digipeater that has repeated the frame.
    pub fn parse(s: &str) -> Result<Self, Ax25Error> {
        let invalid = || Ax25Error::InvalidAddress(s.to_string());
        let (body, repeated) = match s.strip_suffix('*') {
            Some(body) => (body, true),
            None => (s, false),
        };
        let (call, ssid) = match body.split_once('-') {
            Some((call, ssid)) => (call, ssid.parse::<u8>().map_err(|_| invalid())?),
            None => (body, 0),
        };
        if call.is_empty()
            || call.len() > 6
            || !call.chars().all(|c| c.is_ascii_alphanumeric())
            || ssid > 15
        {
            return Err(invalid());
        }
        Ok(Self {
            call: call.to_ascii_uppercase(),
            ssid,
            repeated,
        })
    }

    /// Decode a 7-byte address field, returning the extension (last) bit too.
    fn decode(bytes: &[u8]) -> (Self, bool) {
        let mut call = String::with_capacity(6);
        for &b in &bytes[..6] {
            let ch = b >> 1;
            if ch > b' ' {
                call.push(ch as char);
            }
        }
        let ssid = (bytes[6] >> 1) & 0x0F;
        let repeated = bytes[6] & HAS_BEEN_REPEATED != 0;
        let last = bytes[6] & 0x01 == 1;
        (
            Self {
                call,
                ssid,
                repeated,
            },
            last,
        )
    }

    fn encode(&self, last: bool) -> [u8; ADDR_LEN] {
        let mut out = [b' ' << 1; ADDR_LEN];
        for (slot, b) in out.iter_mut().zip(self.call.bytes().take(6)) {
            *slot = b << 1;
        }
        out[6] = SSID_RESERVED_BITS | (self.ssid << 1) | u8::from(last);
        if self.repeated {
            out[6] |= HAS_BEEN_REPEATED;
        }
        out
    }
}

impl fmt::Display for Ax25Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ssid != 0 {
            write!(f, "{}-{}", self.call, self.ssid)
        } else {
            f.write_str(&self.call)
        }
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Frame {
    pub dest: Ax25Address,
    pub src: Ax25Address,
    pub digis: Vec<Ax25Address>,
    pub info: Vec<u8>,
}

impl Ax25Frame {
    /// Render as a TNC2 monitor line: `SRC>DEST,DIGI1*,DIGI2:info`.
    ///
    /// The last digipeater with its H bit set is marked with `*`.
    pub fn to_tnc2(&self) -> String {
        let mut header = format!("{}>{}", self.src, self.dest);
        let last_repeated = self.digis.iter().rposition(|d| d.repeated);
        for (i, digi) in self.digis.iter().enumerate() {
            header.push(',');
            header.push_str(&digi.to_string());
            if Some(i) == last_repeated {
                header.push('*');
            }
        }
        format!("{}:{}", header, String::from_utf8_lossy(&self.info))
    }
}

/// Parse an AX.25 UI frame (without FCS, as delivered by a KISS TNC).
pub fn parse_ui_frame(frame: &[u8]) -> Result<Ax25Frame, Ax25Error> {
    if frame.len() < 2 * ADDR_LEN {
        return Err(Ax25Error::TooShort(frame.len()));
    }
    let (mut dest, _) = Ax25Address::decode(&frame[..ADDR_LEN]);
    let (mut src, mut last) = Ax25Address::decode(&frame[ADDR_LEN..2 * ADDR_LEN]);
    // Bit 7 is the C bit on these two fields.
    dest.repeated = false;
    src.repeated = false;

    let mut offset = 2 * ADDR_LEN;
    let mut digis = Vec::new();
    while !last {
        if digis.len() == MAX_DIGIPEATERS {
            return Err(Ax25Error::TooManyDigipeaters(digis.len()));
        }
        let Some(field) = frame.get(offset..offset + ADDR_LEN) else {
            return Err(Ax25Error::TooShort(frame.len()));
        };
        let (digi, is_last) = Ax25Address::decode(field);
        digis.push(digi);
        last = is_last;
        offset += ADDR_LEN;
    }

    let Some(&[control, _pid]) = frame.get(offset..offset + 2) else {
        return Err(Ax25Error::MissingControl);
    };
    // Poll/final bit does not matter for UI frames.
    if control & !0x10 != CONTROL_UI {
        return Err(Ax25Error::NotUiFrame(control));
    }

    Ok(Ax25Frame {
        dest,
        src,
        digis,
        info: frame[offset + 2..].to_vec(),
    })
}

/// Build a UI frame; an empty destination becomes `APRS`.
pub fn encode_ui_frame(
    src: &str,
    dest: &str,
    path: &[&str],
    info: &[u8],
) -> Result<Vec<u8>, Ax25Error> {
    let mut dest = Ax25Address::parse(if dest.is_empty() { DEFAULT_DEST } else { dest })?;
    let mut src = Ax25Address::parse(src)?;
    dest.repeated = false;
    src.repeated = false;
    let digis = path
        .iter()
        .map(|p| Ax25Address::parse(p))
        .collect::<Result<Vec<_>, _>>()?;
    if digis.len() > MAX_DIGIPEATERS {
        return Err(Ax25Error::TooManyDigipeaters(digis.len()));
    }

    let mut out = Vec::with_capacity((2 + digis.len()) * ADDR_LEN + 2 + info.len());
    out.extend_from_slice(&dest.encode(false));
    out.extend_from_slice(&src.encode(digis.is_empty()));
    for (i, digi) in digis.iter().enumerate() {
        out.extend_from_slice(&digi.encode(i + 1 == digis.len()));
    }
    out.push(CONTROL_UI);
    out.push(PID_NO_LAYER3);
    out.extend_from_slice(info);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let addr = Ax25Address::parse("f4kmn-11").unwrap();
        assert_eq!(addr.call, "F4KMN");
        assert_eq!(addr.ssid, 11);
        assert_eq!(addr.to_string(), "F4KMN-11");
        assert_eq!(Ax25Address::parse("APLT").unwrap().to_string(), "APLT");
        assert!(Ax25Address::parse("TOOLONGCALL").is_err());
        assert!(Ax25Address::parse("F4KMN-16").is_err());
        assert!(Ax25Address::parse("F4 KMN").is_err());
        assert!(Ax25Address::parse("").is_err());
        assert!(Ax25Address::parse("WIDE1-1*").unwrap().repeated);
        assert!(!Ax25Address::parse("WIDE1-1").unwrap().repeated);
    }

    #[test]
    fn test_decode_hand_built_frame() {
        // APLT <- F4KMN-11 via WIDE1-1, info "!4759.73N/00012.26E"
        let mut frame = Vec::new();
        for (call, ssid, last) in [("APLT", 0u8, false), ("F4KMN", 11, false), ("WIDE1", 1, true)] {
            let mut field = [b' ' << 1; 7];
            for (i, b) in call.bytes().enumerate() {
                field[i] = b << 1;
            }
            field[6] = 0x60 | (ssid << 1) | u8::from(last);
            frame.extend_from_slice(&field);
        }
        frame.extend_from_slice(&[0x03, 0xF0]);
        frame.extend_from_slice(b"!4759.73N/00012.26E");

        let parsed = parse_ui_frame(&frame).unwrap();
        assert_eq!(parsed.src.to_string(), "F4KMN-11");
        assert_eq!(parsed.dest.to_string(), "APLT");
        assert_eq!(parsed.digis.len(), 1);
        assert_eq!(parsed.to_tnc2(), "F4KMN-11>APLT,WIDE1-1:!4759.73N/00012.26E");
    }

    #[test]
    fn test_encoded_frame_parses_back_to_tnc2() {
        let bytes = encode_ui_frame("F4KMN-11", "", &["WIDE1-1", "WIDE2-2"], b"t078h31b10148")
            .unwrap();
        let parsed = parse_ui_frame(&bytes).unwrap();
        assert_eq!(
            parsed.to_tnc2(),
            "F4KMN-11>APRS,WIDE1-1,WIDE2-2:t078h31b10148"
        );
    }

    #[test]
    fn test_repeated_digipeater_is_marked() {
        let bytes = encode_ui_frame(
            "F4KMN-11",
            "APLT",
            &["F1ZXX-3*", "WIDE1*", "WIDE2-1"],
            b"t078h31b10148",
        )
        .unwrap();
        // H bit on the second digipeater field.
        assert_eq!(bytes[27] & 0x80, 0x80);
        assert_eq!(bytes[34] & 0x80, 0x00);

        let parsed = parse_ui_frame(&bytes).unwrap();
        assert!(parsed.digis[0].repeated);
        assert!(parsed.digis[1].repeated);
        assert!(!parsed.digis[2].repeated);
        assert_eq!(
            parsed.to_tnc2(),
            "F4KMN-11>APLT,F1ZXX-3,WIDE1*,WIDE2-1:t078h31b10148"
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_ui_frame(&[0u8; 10]), Err(Ax25Error::TooShort(10)));

        let mut no_control = encode_ui_frame("F4KMN", "APLT", &[], b"").unwrap();
        no_control.truncate(14);
        assert_eq!(parse_ui_frame(&no_control), Err(Ax25Error::MissingControl));

        let mut i_frame = encode_ui_frame("F4KMN", "APLT", &[], b"x").unwrap();
        i_frame[14] = 0x00;
        assert_eq!(parse_ui_frame(&i_frame), Err(Ax25Error::NotUiFrame(0x00)));

        // Extension bit never set.
        let unterminated = vec![0x40u8; 7 * 12];
        assert_eq!(
            parse_ui_frame(&unterminated),
            Err(Ax25Error::TooManyDigipeaters(8))
        );
    }
}
