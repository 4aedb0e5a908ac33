// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! APRS messages sent to the balloon through the KISS TNC.

use std::str::FromStr;

use tokio::io::AsyncWriteExt;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};
use tracing::info;

use sonde_ax25::{encode_kiss, encode_ui_frame, Ax25Error};
use sonde_core::DynResult;

use crate::config::SerialConfig;

/// Destination (tocall) and path used for transmitted messages.
const TOCALL: &str = "APIN21";
const PATH: [&str; 1] = ["WIDE1-1"];
const MAX_ADDRESSEE_LEN: usize = 9;
const MAX_TEXT_LEN: usize = 67;

/// `ADDRESSEE:text` as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub addressee: String,
    pub text: String,
}

impl FromStr for OutgoingMessage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addressee, text) = s
            .split_once(':')
            .ok_or_else(|| format!("expected ADDRESSEE:TEXT, got '{}'", s))?;
        let addressee = addressee.trim().to_ascii_uppercase();
        let text = text.trim().to_string();
        if addressee.is_empty() || addressee.len() > MAX_ADDRESSEE_LEN {
            return Err(format!(
                "addressee must be 1 to {} characters",
                MAX_ADDRESSEE_LEN
            ));
        }
        if text.is_empty() || text.len() > MAX_TEXT_LEN {
            return Err(format!("message text must be 1 to {} characters", MAX_TEXT_LEN));
        }
        Ok(Self { addressee, text })
    }
}

impl OutgoingMessage {
    /// APRS message body: `:ADDRESSEE:text` with the addressee padded to 9.
    pub fn info(&self) -> String {
        format!(":{:<9}:{}", self.addressee, self.text)
    }

    /// KISS data frame carrying this message as an AX.25 UI frame from `source`.
    pub fn to_kiss(&self, source: &str) -> Result<Vec<u8>, Ax25Error> {
        let ax25 = encode_ui_frame(source, TOCALL, &PATH, self.info().as_bytes())?;
        Ok(encode_kiss(0, &ax25))
    }
}

/// Open the serial TNC and write one message.
pub async fn send_message(cfg: &SerialConfig, source: &str, msg: &OutgoingMessage) -> DynResult<()> {
    let frame = msg.to_kiss(source)?;
    let mut port = tokio_serial::new(&cfg.port, cfg.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .open_native_async()
        .map_err(|e| format!("Failed to open serial port {}: {}", cfg.port, e))?;
    port.write_all(&frame).await?;
    port.flush().await?;
    info!(
        "Sent message to {} via {}: {}",
        msg.addressee, cfg.port, msg.text
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonde_ax25::{parse_tnc2, parse_ui_frame, KissDeframer};

    #[test]
    fn test_parse_outgoing_message() {
        let msg: OutgoingMessage = "f4kmn : cut down".parse().unwrap();
        assert_eq!(msg.addressee, "F4KMN");
        assert_eq!(msg.text, "cut down");
        assert_eq!(msg.info(), ":F4KMN    :cut down");

        assert!("no separator".parse::<OutgoingMessage>().is_err());
        assert!(":text".parse::<OutgoingMessage>().is_err());
        assert!("F4KMN:".parse::<OutgoingMessage>().is_err());
        assert!("TOOLONGCALL:x".parse::<OutgoingMessage>().is_err());
        assert!(format!("F4KMN:{}", "x".repeat(68))
            .parse::<OutgoingMessage>()
            .is_err());
    }

    #[test]
    fn test_kiss_frame_decodes_back_to_the_message() {
        let msg: OutgoingMessage = "F4KMN:ping".parse().unwrap();
        let bytes = msg.to_kiss("F4LTZ").unwrap();

        let kiss = KissDeframer::new().push(&bytes);
        assert_eq!(kiss.len(), 1);
        assert!(kiss[0].is_data());
        let line = parse_ui_frame(&kiss[0].payload).unwrap().to_tnc2();
        assert_eq!(line, "F4LTZ>APIN21,WIDE1-1::F4KMN    :ping");

        let frame = parse_tnc2(&line).unwrap();
        assert_eq!(frame.message(), ("F4KMN".to_string(), "ping".to_string()));
    }

    #[test]
    fn test_bad_source_callsign_is_rejected() {
        let msg: OutgoingMessage = "F4KMN:ping".parse().unwrap();
        assert!(matches!(
            msg.to_kiss("NOT A CALL"),
            Err(Ax25Error::InvalidAddress(_))
        ));
    }
}
