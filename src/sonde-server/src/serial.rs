// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! KISS TNC on a serial port.

use std::sync::Arc;
use std::time::Duration;

use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};
use tracing::{info, warn};

use crate::config::SerialConfig;
use crate::ingest::Ingest;
use crate::listener::read_kiss_stream;

const REOPEN_DELAY: Duration = Duration::from_secs(5);

/// Read KISS frames from the configured port, reopening it when the
/// device goes away.
pub async fn run_serial(cfg: SerialConfig, ingest: Arc<Ingest>) {
    loop {
        let port = tokio_serial::new(&cfg.port, cfg.baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .open_native_async();
        match port {
            Ok(port) => {
                info!("Serial KISS TNC on {} @ {} baud", cfg.port, cfg.baud);
                match read_kiss_stream(port, &cfg.port, &ingest).await {
                    Ok(()) => warn!("Serial port {} closed", cfg.port),
                    Err(e) => warn!("Serial port {} read failed: {}", cfg.port, e),
                }
            }
            Err(e) => warn!("Failed to open serial port {}: {}", cfg.port, e),
        }
        tokio::time::sleep(REOPEN_DELAY).await;
    }
}
