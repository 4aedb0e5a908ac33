// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

mod aprsis;
mod config;
mod ingest;
mod listener;
mod serial;
mod transmit;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use sonde_app::{init_logging, normalize_callsign, ConfigFile};
use sonde_core::DynResult;
use sonde_decode_log::DecoderLoggers;
use sonde_frames::BatchDecoder;
use sonde_store::{build_chart, Chart, FrameFilter, FrameStore, PickleFrameStore};

use config::ServerConfig;
use ingest::{import_file, ImportFormat, Ingest};
use listener::Discipline;
use transmit::OutgoingMessage;

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - balloon ground station");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print example configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
    /// Frame database (overrides [store].path)
    #[arg(long = "store", value_name = "FILE")]
    store: Option<PathBuf>,
    /// Import frames from a capture file and exit
    #[arg(long = "import", value_name = "FILE")]
    import: Option<PathBuf>,
    /// Format of the import file
    #[arg(long = "format", value_enum, default_value = "tnc2")]
    format: ImportFormat,
    /// Print a chart as JSON and exit (source, destination, day,
    /// top-messages, hourly, history, telemetry, map)
    #[arg(long = "chart", value_name = "CHART")]
    chart: Option<Chart>,
    /// Only frames received at or after this RFC 3339 time
    #[arg(long = "from", value_parser = parse_time)]
    from: Option<DateTime<Utc>>,
    /// Only frames received at or before this RFC 3339 time
    #[arg(long = "to", value_parser = parse_time)]
    to: Option<DateTime<Utc>>,
    /// Only frames from this source callsign
    #[arg(long = "source")]
    source: Option<String>,
    /// Only frames to this destination
    #[arg(long = "destination")]
    destination: Option<String>,
    /// Row limit for top-messages and history
    #[arg(long = "limit")]
    limit: Option<usize>,
    /// Send an APRS message (ADDRESSEE:TEXT) through the serial TNC and exit
    #[arg(long = "send", value_name = "ADDRESSEE:TEXT")]
    send: Option<OutgoingMessage>,
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 time '{}': {}", s, e))
}

fn frame_filter(cli: &Cli) -> DynResult<FrameFilter> {
    if let (Some(from), Some(to)) = (cli.from, cli.to) {
        if from > to {
            return Err("--from must not be later than --to".into());
        }
    }
    Ok(FrameFilter {
        start: cli.from,
        end: cli.to,
        source: cli.source.as_deref().map(normalize_callsign),
        destination: cli.destination.as_deref().map(normalize_callsign),
    })
}

fn spawn_listener(
    addr: SocketAddr,
    discipline: Discipline,
    ingest: &Arc<Ingest>,
) -> JoinHandle<()> {
    let ingest = Arc::clone(ingest);
    tokio::spawn(async move {
        if let Err(e) = listener::run_listener(addr, discipline, ingest).await {
            error!("{:?} listener error: {:?}", discipline, e);
        }
    })
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", ServerConfig::example_combined_toml());
        return Ok(());
    }

    let (cfg, config_path) = if let Some(ref path) = cli.config {
        let cfg = ServerConfig::load_from_file(path)?;
        (cfg, Some(path.clone()))
    } else {
        ServerConfig::load_from_default_paths()?
    };
    cfg.validate()
        .map_err(|e| format!("Invalid server configuration: {}", e))?;

    init_logging(cfg.general.log_level.as_deref());

    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    if let Some(ref msg) = cli.send {
        let source = cfg
            .general
            .callsign
            .as_deref()
            .map(normalize_callsign)
            .ok_or("[general].callsign is required to send messages")?;
        transmit::send_message(&cfg.serial, &source, msg).await?;
        return Ok(());
    }

    let decoder = BatchDecoder::new()
        .with_strict_ranges(cfg.decode.strict_ranges)
        .with_workers(cfg.decode.workers);

    let store_path = cli
        .store
        .clone()
        .or_else(|| cfg.store.path.clone())
        .unwrap_or_else(PickleFrameStore::default_path);
    let store: Arc<dyn FrameStore> = Arc::new(PickleFrameStore::open(&store_path)?);
    info!(
        "Frame store {} ({} frames)",
        store_path.display(),
        store.len()
    );

    if let Some(chart) = cli.chart {
        let filter = frame_filter(&cli)?;
        let value = build_chart(store.as_ref(), chart, &filter, cli.limit, &decoder)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let loggers = DecoderLoggers::from_config(&cfg.decode_logs)?;
    let mut ingest = Ingest::new(store, decoder, loggers);

    if let Some(ref path) = cli.import {
        import_file(&ingest, path, cli.format)?;
        return Ok(());
    }

    if let Some(ref cs) = cfg.general.callsign {
        info!("Starting sonde-server (station: {})", normalize_callsign(cs));
    }

    if !cfg.listen.enabled && !cfg.serial.enabled {
        return Err("No ingest source enabled; enable [listen] or [serial]".into());
    }

    let mut task_handles: Vec<JoinHandle<()>> = Vec::new();
    if cfg.aprsis.enabled {
        match cfg.aprsis_callsign() {
            Some(callsign) => {
                let (uplink_tx, uplink_rx) = broadcast::channel(256);
                ingest = ingest.with_uplink(uplink_tx);
                task_handles.push(tokio::spawn(aprsis::run_aprsis_uplink(
                    cfg.aprsis.clone(),
                    callsign,
                    uplink_rx,
                )));
            }
            None => warn!("APRS-IS IGate enabled but no callsign is set; uplink disabled"),
        }
    }
    let ingest = Arc::new(ingest);

    if cfg.listen.enabled {
        let tnc2_addr = SocketAddr::from((cfg.listen.listen, cfg.listen.tnc2_port));
        let kiss_addr = SocketAddr::from((cfg.listen.listen, cfg.listen.kiss_port));
        task_handles.push(spawn_listener(tnc2_addr, Discipline::Tnc2, &ingest));
        task_handles.push(spawn_listener(kiss_addr, Discipline::Kiss, &ingest));
    }
    if cfg.serial.enabled {
        task_handles.push(tokio::spawn(serial::run_serial(
            cfg.serial.clone(),
            Arc::clone(&ingest),
        )));
    }

    signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down");
    for handle in task_handles {
        handle.abort();
    }

    Ok(())
}
