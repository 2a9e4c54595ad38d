//! Export artifact naming and CSV writing.

use crate::config::ExportTimezone;
use crate::data::cache::CSV_HEADER;
use crate::domain::{Tick, ZonedTick};
use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory name of export artifacts under an output directory.
pub const PROCESSED_DATA_DIR: &str = "processed_data";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// `{export_symbol}-{timezone with / as _}-{YYYY-MM-DD}.csv`
pub fn export_file_name(export_symbol: &str, tz: ExportTimezone, run_date: NaiveDate) -> String {
    format!("{export_symbol}-{}-{}.csv", tz.file_suffix(), run_date.format("%Y-%m-%d"))
}

/// Full artifact path under `<output_dir>/processed_data`.
pub fn export_path(output_dir: &Path, export_symbol: &str, tz: ExportTimezone, run_date: NaiveDate) -> PathBuf {
    output_dir
        .join(PROCESSED_DATA_DIR)
        .join(export_file_name(export_symbol, tz, run_date))
}

#[derive(Serialize)]
struct ZonedRow {
    timestamp: String,
    #[serde(rename = "bidPrice")]
    bid: f64,
    #[serde(rename = "askPrice")]
    ask: f64,
    #[serde(rename = "bidVolume")]
    bid_volume: f64,
    #[serde(rename = "askVolume")]
    ask_volume: f64,
}

impl From<ZonedTick> for ZonedRow {
    fn from(tick: ZonedTick) -> Self {
        Self {
            timestamp: tick
                .timestamp
                .fixed_offset()
                .to_rfc3339_opts(SecondsFormat::AutoSi, false),
            bid: tick.bid,
            ask: tick.ask,
            bid_volume: tick.bid_volume,
            ask_volume: tick.ask_volume,
        }
    }
}

/// Write ticks to `path` with timestamps rendered in `tz`, replacing any existing file.
///
/// Parent directories are created. The file is written beside its final
/// name and renamed into place.
pub fn write_export(path: &Path, ticks: &[Tick], tz: ExportTimezone) -> Result<(), ExportError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        if ticks.is_empty() {
            writer.write_record(CSV_HEADER)?;
        }
        for tick in ticks {
            writer.serialize(ZonedRow::from(tick.in_zone(tz.tz())))?;
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
