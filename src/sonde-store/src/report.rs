// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Grouping queries behind the ground station charts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use sonde_core::decode::{DecodedRecord, TelemetryReading};
use sonde_core::frame::RawFrame;
use sonde_frames::BatchDecoder;

use crate::filter::{FrameFilter, FrameOrder};
use crate::{FrameStore, StoreError};

pub const DEFAULT_TOP_MESSAGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub key: String,
    pub total: usize,
}

fn count_by<F>(frames: &[RawFrame], key: F) -> Vec<CountRow>
where
    F: Fn(&RawFrame) -> String,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for frame in frames {
        *counts.entry(key(frame)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(key, total)| CountRow { key, total })
        .collect()
}

pub fn count_by_source(frames: &[RawFrame]) -> Vec<CountRow> {
    count_by(frames, |f| f.source.clone())
}

pub fn count_by_destination(frames: &[RawFrame]) -> Vec<CountRow> {
    count_by(frames, |f| f.destination.clone())
}

/// Frames per UTC day (`YYYY-MM-DD`).
pub fn count_by_day(frames: &[RawFrame]) -> Vec<CountRow> {
    count_by(frames, |f| f.received_at.format("%Y-%m-%d").to_string())
}

/// Frames per UTC hour (`YYYY-MM-DD HH:00:00`).
pub fn count_by_hour(frames: &[RawFrame]) -> Vec<CountRow> {
    count_by(frames, |f| f.received_at.format("%Y-%m-%d %H:00:00").to_string())
}

/// Most repeated messages, by count then message text.
pub fn top_messages(frames: &[RawFrame], limit: usize) -> Vec<CountRow> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for frame in frames {
        *counts.entry(frame.message.as_str()).or_default() += 1;
    }
    let mut rows: Vec<CountRow> = counts
        .into_iter()
        .map(|(key, total)| CountRow {
            key: key.to_string(),
            total,
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    rows.truncate(limit);
    rows
}

/// Decoded telemetry in frame order.
pub fn telemetry_series(frames: &[RawFrame], decoder: &BatchDecoder) -> Vec<TelemetryReading> {
    decoder
        .decode(frames)
        .into_iter()
        .filter_map(|record| match record {
            DecodedRecord::Telemetry(reading) => Some(reading),
            DecodedRecord::Position(_) => None,
        })
        .collect()
}

/// One point of a flight track on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub source: String,
    pub received_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Decoded positions in frame order, with the station and time they came from.
pub fn position_track(frames: &[RawFrame], decoder: &BatchDecoder) -> Vec<TrackPoint> {
    frames
        .iter()
        .filter_map(|frame| match decoder.decode_one(frame) {
            Ok(DecodedRecord::Position(fix)) => Some(TrackPoint {
                source: frame.source.clone(),
                received_at: frame.received_at,
                latitude: fix.latitude,
                longitude: fix.longitude,
            }),
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    Source,
    Destination,
    Day,
    TopMessages,
    Hourly,
    History,
    Telemetry,
    Map,
}

impl Chart {
    pub const ALL: [Chart; 8] = [
        Chart::Source,
        Chart::Destination,
        Chart::Day,
        Chart::TopMessages,
        Chart::Hourly,
        Chart::History,
        Chart::Telemetry,
        Chart::Map,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chart::Source => "source",
            Chart::Destination => "destination",
            Chart::Day => "day",
            Chart::TopMessages => "top-messages",
            Chart::Hourly => "hourly",
            Chart::History => "history",
            Chart::Telemetry => "telemetry",
            Chart::Map => "map",
        }
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Chart::ALL
            .into_iter()
            .find(|chart| chart.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Chart::ALL.iter().map(Chart::as_str).collect();
                format!("unknown chart '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Run one chart query and return its rows as JSON.
///
/// `limit` caps `top-messages` (default 10) and `history` (unlimited by
/// default); other charts ignore it. `decoder` decodes the telemetry and
/// map charts.
pub fn build_chart(
    store: &dyn FrameStore,
    chart: Chart,
    filter: &FrameFilter,
    limit: Option<usize>,
    decoder: &BatchDecoder,
) -> Result<Value, StoreError> {
    let order = match chart {
        Chart::History => FrameOrder::Descending,
        _ => FrameOrder::Ascending,
    };
    let frames = store.fetch(filter, order)?;
    let value = match chart {
        Chart::Source => serde_json::to_value(count_by_source(&frames))?,
        Chart::Destination => serde_json::to_value(count_by_destination(&frames))?,
        Chart::Day => serde_json::to_value(count_by_day(&frames))?,
        Chart::Hourly => serde_json::to_value(count_by_hour(&frames))?,
        Chart::TopMessages => serde_json::to_value(top_messages(
            &frames,
            limit.unwrap_or(DEFAULT_TOP_MESSAGES),
        ))?,
        Chart::History => {
            let shown = limit.unwrap_or(frames.len()).min(frames.len());
            serde_json::to_value(&frames[..shown])?
        }
        Chart::Telemetry => serde_json::to_value(telemetry_series(&frames, decoder))?,
        Chart::Map => serde_json::to_value(position_track(&frames, decoder))?,
    };
    Ok(value)
}
