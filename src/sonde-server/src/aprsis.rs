// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! APRS-IS IGate uplink: forwards frames heard on the KISS TNC to APRS-IS.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

use sonde_ax25::Tnc2Frame;

use crate::config::AprsIsConfig;

const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(60);
const MAX_BACKOFF_SECS: u64 = 60;

/// Path entries that keep a frame off APRS-IS.
const NO_GATE: [&str; 4] = ["TCPIP", "TCPXX", "NOGATE", "RFONLY"];

/// APRS-IS passcode for a callsign: SSID stripped, first 10 characters
/// uppercased, XOR-hashed in byte pairs from 0x73E2, masked to 15 bits.
pub fn compute_passcode(callsign: &str) -> u16 {
    let base = callsign.split('-').next().unwrap_or(callsign);
    let upper: Vec<u8> = base
        .bytes()
        .take(10)
        .map(|b| b.to_ascii_uppercase())
        .collect();

    let mut hash: u16 = 0x73e2;
    for pair in upper.chunks(2) {
        hash ^= u16::from(pair[0]) << 8;
        if let Some(&low) = pair.get(1) {
            hash ^= u16::from(low);
        }
    }
    hash & 0x7fff
}

/// Whether a heard frame may be sent to APRS-IS.
fn should_gate(frame: &Tnc2Frame) -> bool {
    !frame.path.iter().any(|hop| {
        let call = hop.trim_end_matches('*');
        NO_GATE.iter().any(|blocked| call.eq_ignore_ascii_case(blocked))
    })
}

fn format_tnc2(frame: &Tnc2Frame) -> String {
    format!("{}\r\n", frame)
}

struct Backoff {
    secs: u64,
}

impl Backoff {
    fn new() -> Self {
        Self { secs: 1 }
    }

    fn reset(&mut self) {
        self.secs = 1;
    }

    async fn wait(&mut self) {
        time::sleep(Duration::from_secs(self.secs)).await;
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
    }
}

async fn read_logresp<R>(lines: &mut Lines<R>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        if line.starts_with("# logresp") {
            return Ok(Some(line));
        }
        debug!("APRS-IS banner: {}", line);
    }
    Ok(None)
}

/// Connect, send the login line and wait for `# logresp`.
/// Returns the write half and whether the login was verified.
async fn login(
    cfg: &AprsIsConfig,
    callsign: &str,
    passcode: u16,
) -> std::io::Result<(OwnedWriteHalf, bool)> {
    let stream = TcpStream::connect((cfg.server.as_str(), cfg.port)).await?;
    let (read_half, mut write_half) = stream.into_split();

    let line = format!(
        "user {} pass {} vers sonde-server {}\r\n",
        callsign,
        passcode,
        env!("CARGO_PKG_VERSION")
    );
    write_half.write_all(line.as_bytes()).await?;

    let mut lines = BufReader::new(read_half).lines();
    let logresp = time::timeout(LOGIN_TIMEOUT, read_logresp(&mut lines))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no logresp"))??;

    match logresp {
        Some(line) => Ok((write_half, !line.contains("unverified"))),
        None => Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed before logresp",
        )),
    }
}

/// Run the IGate uplink until the frame channel closes.
///
/// Every frame received on `frames_rx` whose path allows it is written to
/// APRS-IS as a TNC2 line. The connection is re-established with
/// exponential backoff (1 s up to 60 s).
pub async fn run_aprsis_uplink(
    cfg: AprsIsConfig,
    callsign: String,
    mut frames_rx: broadcast::Receiver<Tnc2Frame>,
) {
    let passcode = if cfg.passcode < 0 {
        compute_passcode(&callsign)
    } else {
        (cfg.passcode as u16) & 0x7fff
    };
    let mut backoff = Backoff::new();
    let mut gated: u64 = 0;
    let mut skipped: u64 = 0;

    loop {
        let mut writer = match login(&cfg, &callsign, passcode).await {
            Ok((writer, verified)) => {
                info!(
                    "APRS-IS IGate connected to {}:{} as {} ({})",
                    cfg.server,
                    cfg.port,
                    callsign,
                    if verified { "verified" } else { "unverified" }
                );
                backoff.reset();
                writer
            }
            Err(e) => {
                warn!(
                    "APRS-IS IGate: login to {}:{} failed: {}, retrying in {}s",
                    cfg.server, cfg.port, e, backoff.secs
                );
                backoff.wait().await;
                continue;
            }
        };

        let first_keepalive = time::Instant::now() + KEEPALIVE_PERIOD;
        let mut keepalive = time::interval_at(first_keepalive, KEEPALIVE_PERIOD);
        let write_err = loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    debug!("APRS-IS: gated={}, skipped={}", gated, skipped);
                    if let Err(e) = writer.write_all(b"# sonde-server keepalive\r\n").await {
                        break e;
                    }
                }
                recv = frames_rx.recv() => match recv {
                    Ok(frame) => {
                        if !should_gate(&frame) {
                            skipped += 1;
                            continue;
                        }
                        if let Err(e) = writer.write_all(format_tnc2(&frame).as_bytes()).await {
                            break e;
                        }
                        gated += 1;
                        debug!("APRS-IS: gated {}>{}", frame.source, frame.destination);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("APRS-IS IGate: dropped {} frames (channel lagged)", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        };

        warn!(
            "APRS-IS IGate: write to {}:{} failed: {}, reconnecting in {}s",
            cfg.server, cfg.port, write_err, backoff.secs
        );
        backoff.wait().await;
    }
}
