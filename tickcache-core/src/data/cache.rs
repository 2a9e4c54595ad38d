//! Partitioned CSV tick cache.
//!
//! Layout: `{root}/{SYMBOL}/{year}/{month:02}.csv`, where `root` is normally
//! `<output_dir>/raw_cache` and `/` in symbols is replaced by `_`.
//!
//! Features:
//! - One file per UTC calendar month; rows unique by timestamp, ascending
//! - Merge-on-write: new rows win over existing rows with the same timestamp
//! - Atomic writes (write to .tmp, rename into place)
//! - Unparseable partitions are skipped on load with a warning
//! - A corrupt partition that is about to be overwritten is kept aside as `.csv.corrupt`

use super::merge;
use super::provider::DataError;
use crate::domain::{PartitionKey, Tick, TimeWindow};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name of the cache under an output directory.
pub const RAW_CACHE_DIR: &str = "raw_cache";

/// CSV header shared by cache partitions and export artifacts.
pub const CSV_HEADER: [&str; 5] = ["timestamp", "bidPrice", "askPrice", "bidVolume", "askVolume"];

/// One CSV row as stored on disk.
#[derive(Debug, Serialize, Deserialize)]
struct TickRow {
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

impl TickRow {
    fn from_tick(tick: &Tick) -> Self {
        Self {
            timestamp: tick.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            bid: tick.bid,
            ask: tick.ask,
            bid_volume: tick.bid_volume,
            ask_volume: tick.ask_volume,
        }
    }

    fn into_tick(self) -> Result<Tick, DataError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| DataError::Cache(format!("bad timestamp '{}': {e}", self.timestamp)))?
            .with_timezone(&Utc);
        Ok(Tick::new(
            timestamp,
            self.bid,
            self.ask,
            self.bid_volume,
            self.ask_volume,
        ))
    }
}

/// The partitioned tick cache.
#[derive(Debug, Clone)]
pub struct PartitionCache {
    root: PathBuf,
}

impl PartitionCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted at `<output_dir>/raw_cache`.
    pub fn under_output_dir(output_dir: &Path) -> Self {
        Self::new(output_dir.join(RAW_CACHE_DIR))
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a specific symbol: `{root}/{SYMBOL}` with `/` replaced by `_`.
    pub fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(symbol_dir_name(symbol))
    }

    /// Path to a partition file: `{root}/{SYMBOL}/{year}/{month:02}.csv`
    pub fn partition_path(&self, symbol: &str, key: PartitionKey) -> PathBuf {
        self.symbol_dir(symbol)
            .join(key.year.to_string())
            .join(format!("{:02}.csv", key.month))
    }

    /// Read one partition. `Ok(None)` if the file does not exist.
    pub fn read_partition(&self, symbol: &str, key: PartitionKey) -> Result<Option<Vec<Tick>>, DataError> {
        let path = self.partition_path(symbol, key);
        if !path.exists() {
            return Ok(None);
        }
        read_tick_csv(&path).map(Some)
    }

    /// Load every partition overlapping `window`, sorted, deduplicated and clipped.
    ///
    /// Unparseable partitions are logged and treated as absent.
    pub fn load_window(&self, symbol: &str, window: &TimeWindow) -> Vec<Tick> {
        let mut all = Vec::new();
        for key in window.partitions() {
            match self.read_partition(symbol, key) {
                Ok(Some(ticks)) => all.extend(ticks),
                Ok(None) => {}
                Err(e) => warn!(
                    symbol,
                    partition = %key,
                    path = %self.partition_path(symbol, key).display(),
                    "could not load or parse cache partition, treating it as missing: {e}"
                ),
            }
        }
        merge::clip(merge::normalize(all), window)
    }

    /// Merge ticks into the cache, one partition per calendar month.
    ///
    /// Existing partitions are read, merged with new-wins semantics and
    /// rewritten; missing partitions are created. Returns the partitions touched.
    pub fn write(&self, symbol: &str, ticks: &[Tick]) -> Result<Vec<PartitionKey>, DataError> {
        let mut by_month: BTreeMap<PartitionKey, Vec<Tick>> = BTreeMap::new();
        for tick in ticks {
            by_month
                .entry(PartitionKey::of(tick.timestamp))
                .or_default()
                .push(*tick);
        }

        for (key, month_ticks) in &by_month {
            let path = self.partition_path(symbol, *key);
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .map_err(|e| DataError::Cache(format!("failed to create {}: {e}", dir.display())))?;
            }

            let existing = if path.exists() {
                match read_tick_csv(&path) {
                    Ok(existing) => existing,
                    Err(e) => {
                        let aside = path.with_extension("csv.corrupt");
                        warn!(
                            symbol,
                            partition = %key,
                            "replacing unparseable cache partition (kept as {}): {e}",
                            aside.display()
                        );
                        fs::rename(&path, &aside)?;
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };

            let merged = merge::merge_newest_wins(existing, month_ticks.clone());
            write_tick_csv_atomic(&path, &merged)?;
            debug!(symbol, partition = %key, rows = merged.len(), "wrote cache partition");
        }

        Ok(by_month.into_keys().collect())
    }

    /// Summarize every symbol currently in the cache, sorted by directory name.
    pub fn status(&self) -> Result<Vec<CacheStatus>, DataError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut statuses = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            statuses.push(symbol_status(&entry.path())?);
        }
        statuses.sort_by(|a, b| a.symbol_dir.cmp(&b.symbol_dir));
        Ok(statuses)
    }
}

/// Directory name for a symbol: `/` replaced by `_`.
pub fn symbol_dir_name(symbol: &str) -> String {
    symbol.replace('/', "_")
}

/// Cache status for a single symbol directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub symbol_dir: String,
    pub partitions: usize,
    pub rows: usize,
    pub corrupt_partitions: usize,
    pub first_partition: Option<PartitionKey>,
    pub last_partition: Option<PartitionKey>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub bytes: u64,
}

fn symbol_status(dir: &Path) -> Result<CacheStatus, DataError> {
    let mut keys: Vec<(PartitionKey, PathBuf)> = Vec::new();
    let mut bytes = 0u64;

    for year_entry in fs::read_dir(dir)? {
        let year_entry = year_entry?;
        let Some(year) = year_entry.file_name().to_str().and_then(|s| s.parse::<i32>().ok()) else {
            continue;
        };
        if !year_entry.file_type()?.is_dir() {
            continue;
        }
        for month_entry in fs::read_dir(year_entry.path())? {
            let month_entry = month_entry?;
            let path = month_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(month) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|m| (1..=12).contains(m))
            else {
                continue;
            };
            bytes += month_entry.metadata()?.len();
            keys.push((PartitionKey::new(year, month), path));
        }
    }
    keys.sort_by_key(|(key, _)| *key);

    let mut rows = 0;
    let mut corrupt_partitions = 0;
    let mut last_timestamp = None;
    for (_, path) in &keys {
        match read_tick_csv(path) {
            Ok(ticks) => {
                rows += ticks.len();
                if let Some(last) = ticks.last() {
                    last_timestamp = Some(last.timestamp);
                }
            }
            Err(_) => corrupt_partitions += 1,
        }
    }

    Ok(CacheStatus {
        symbol_dir: dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        partitions: keys.len(),
        rows,
        corrupt_partitions,
        first_partition: keys.first().map(|(k, _)| *k),
        last_partition: keys.last().map(|(k, _)| *k),
        last_timestamp,
        bytes,
    })
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

/// Read a tick CSV file in the cache format.
fn read_tick_csv(path: &Path) -> Result<Vec<Tick>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?;
    if headers.iter().ne(CSV_HEADER.iter().copied()) {
        return Err(DataError::Cache(format!(
            "unexpected header in {}: {:?}",
            path.display(),
            headers
        )));
    }

    let mut ticks = Vec::new();
    for row in reader.deserialize::<TickRow>() {
        ticks.push(row?.into_tick()?);
    }
    Ok(merge::normalize(ticks))
}

/// Write ticks in the cache format through a temp file renamed into place.
fn write_tick_csv_atomic(path: &Path, ticks: &[Tick]) -> Result<(), DataError> {
    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        for tick in ticks {
            writer.serialize(TickRow::from_tick(tick))?;
        }
        if ticks.is_empty() {
            writer.write_record(CSV_HEADER)?;
        }
        writer.flush()?;
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Cache(format!("atomic rename failed: {e}"))
    })
}
