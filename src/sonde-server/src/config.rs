// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration file support for sonde-server.
//!
//! Config is loaded from the `[sonde-server]` section of `sonde-rs.toml`.
//! Default search order:
//! 1. Path specified via `--config` CLI argument
//! 2. `./sonde-rs.toml`
//! 3. `~/.config/sonde-rs/sonde-rs.toml`
//! 4. `/etc/sonde-rs/sonde-rs.toml`

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sonde_app::{normalize_callsign, ConfigFile};
pub use sonde_decode_log::DecodeLogsConfig;

/// Top-level server configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Frame persistence
    pub store: StoreConfig,
    /// Decoder options
    pub decode: DecodeConfig,
    /// TCP ingest listeners
    pub listen: ListenConfig,
    /// KISS TNC on a serial port
    pub serial: SerialConfig,
    /// APRS-IS IGate uplink
    pub aprsis: AprsIsConfig,
    /// Decoded record file logging
    pub decode_logs: DecodeLogsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Ground station callsign
    pub callsign: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            callsign: Some("N0CALL".to_string()),
            log_level: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Frame database path; the platform data dir when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Drop frames whose humidity or minutes are out of range
    pub strict_ranges: bool,
    /// Decoder threads for imported batches
    pub workers: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            strict_ranges: false,
            workers: 1,
        }
    }
}

/// TCP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Whether the listeners are enabled
    pub enabled: bool,
    /// IP address to listen on
    pub listen: IpAddr,
    /// Port for TNC2 monitor lines
    pub tnc2_port: u16,
    /// Port for a KISS byte stream
    pub kiss_port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: IpAddr::V4(Ipv4Addr::LOCALHOST),
            tnc2_port: 4540,
            kiss_port: 8001,
        }
    }
}

/// KISS TNC attached to a serial port (8N1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub enabled: bool,
    /// Serial device path
    pub port: String,
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: "/dev/ttyUSB0".to_string(),
            baud: 9600,
        }
    }
}

/// APRS-IS IGate uplink for frames heard on the KISS TNC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AprsIsConfig {
    pub enabled: bool,
    /// APRS-IS server hostname
    pub server: String,
    pub port: u16,
    /// Login callsign; `[general].callsign` when unset
    pub callsign: Option<String>,
    /// APRS-IS passcode. -1 = computed from the login callsign.
    pub passcode: i32,
}

impl Default for AprsIsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: "france.aprs2.net".to_string(),
            port: 14580,
            callsign: None,
            passcode: -1,
        }
    }
}

impl ServerConfig {
    /// Callsign used to log in to APRS-IS.
    pub fn aprsis_callsign(&self) -> Option<String> {
        self.aprsis
            .callsign
            .as_deref()
            .or(self.general.callsign.as_deref())
            .map(normalize_callsign)
            .filter(|call| !call.is_empty())
    }

    /// Validate semantic constraints not enforced by the TOML schema.
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        if self.decode.workers == 0 {
            return Err("[decode].workers must be >= 1".to_string());
        }

        if self.listen.enabled {
            if self.listen.tnc2_port == 0 {
                return Err("[listen].tnc2_port must be > 0 when listener is enabled".to_string());
            }
            if self.listen.kiss_port == 0 {
                return Err("[listen].kiss_port must be > 0 when listener is enabled".to_string());
            }
            if self.listen.tnc2_port == self.listen.kiss_port {
                return Err("[listen].tnc2_port and [listen].kiss_port must differ".to_string());
            }
        }

        if self.serial.enabled {
            if self.serial.port.trim().is_empty() {
                return Err("[serial].port must not be empty when serial is enabled".to_string());
            }
            if self.serial.baud == 0 {
                return Err("[serial].baud must be > 0".to_string());
            }
        }

        if self.aprsis.enabled {
            if self.aprsis.server.trim().is_empty() {
                return Err("[aprsis].server must not be empty".to_string());
            }
            if self.aprsis.port == 0 {
                return Err("[aprsis].port must be > 0".to_string());
            }
            if !(-1..=0x7fff).contains(&self.aprsis.passcode) {
                return Err("[aprsis].passcode must be -1 or 0..=32767".to_string());
            }
            if self.aprsis_callsign().is_none() {
                return Err(
                    "[aprsis].callsign or [general].callsign is required when aprsis is enabled"
                        .to_string(),
                );
            }
        }

        if self.decode_logs.enabled {
            if self.decode_logs.dir.trim().is_empty() {
                return Err("[decode_logs].dir must not be empty".to_string());
            }
            if self.decode_logs.telemetry_file.trim().is_empty() {
                return Err("[decode_logs].telemetry_file must not be empty".to_string());
            }
            if self.decode_logs.position_file.trim().is_empty() {
                return Err("[decode_logs].position_file must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Example config wrapped in its `[sonde-server]` section.
    pub fn example_combined_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "sonde-server")]
            inner: ServerConfig,
        }
        let example = ServerConfig {
            general: GeneralConfig {
                callsign: Some("N0CALL".to_string()),
                log_level: Some("info".to_string()),
            },
            store: StoreConfig {
                path: Some(PathBuf::from("/var/lib/sonde-rs/frames.db")),
            },
            decode: DecodeConfig::default(),
            listen: ListenConfig::default(),
            serial: SerialConfig::default(),
            aprsis: AprsIsConfig::default(),
            decode_logs: DecodeLogsConfig::default(),
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        match level {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(format!(
                    "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                    level
                ))
            }
        }
    }
    Ok(())
}

impl ConfigFile for ServerConfig {
    fn section_key() -> &'static str {
        "sonde-server"
    }
}
