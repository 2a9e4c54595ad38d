//! Dukascopy datafeed provider.
//!
//! Tick history is published as one LZMA-compressed `.bi5` file per UTC hour:
//! `{base}/{INSTRUMENT}/{YYYY}/{MM}/{DD}/{HH}h_ticks.bi5`, with the month
//! zero-based. Each decompressed record is 20 bytes, big-endian:
//! millisecond offset into the hour (u32), ask and bid in points (u32),
//! ask and bid volume (f32).
//!
//! An empty body or a 404 means the hour has no ticks (weekends, holidays,
//! hours that have not happened yet). Any other failure aborts the fetch;
//! there are no retries.

use super::provider::{DataError, FetchRequest, TickProvider};
use crate::domain::{day_start, Tick, TimeWindow};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::io::Cursor;
use tracing::debug;

/// Public datafeed root.
pub const DEFAULT_BASE_URL: &str = "https://datafeed.dukascopy.com/datafeed";

const RECORD_LEN: usize = 20;

/// Dukascopy tick provider over blocking HTTP.
pub struct DukascopyProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl DukascopyProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("tickcache/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the tick file for the hour starting at `hour`.
    fn hour_url(&self, instrument: &str, hour: DateTime<Utc>) -> String {
        format!(
            "{}/{instrument}/{:04}/{:02}/{:02}/{:02}h_ticks.bi5",
            self.base_url,
            hour.year(),
            hour.month0(),
            hour.day(),
            hour.hour()
        )
    }

    /// Download one hour. `Ok(empty)` when the feed has nothing for it.
    fn fetch_hour(&self, instrument: &str, hour: DateTime<Utc>) -> Result<Vec<u8>, DataError> {
        let url = self.hour_url(instrument, hour);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| DataError::Network(format!("reading body of {url}: {e}")))
    }
}

impl TickProvider for DukascopyProvider {
    fn name(&self) -> &str {
        "dukascopy"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<Vec<Tick>, DataError> {
        let instrument = instrument_code(&request.symbol);
        let scale = point_scale(&instrument);
        let mut ticks = Vec::new();

        for hour in hours_in(&request.window) {
            let body = self.fetch_hour(&instrument, hour)?;
            let decoded = decode_hour(hour, &body, scale)?;
            ticks.extend(decoded.into_iter().filter(|t| request.window.contains(t.timestamp)));
        }

        debug!(
            symbol = %request.symbol,
            interval = %request.interval,
            side = %request.side,
            window = %request.window,
            ticks = ticks.len(),
            "dukascopy fetch complete"
        );
        Ok(ticks)
    }
}

/// Feed instrument code: `EUR/USD` → `EURUSD`.
pub fn instrument_code(symbol: &str) -> String {
    symbol.replace('/', "").to_uppercase()
}

/// Divisor turning integer points into prices.
///
/// JPY crosses and precious metals are quoted with three decimals, everything
/// else with five.
pub fn point_scale(instrument: &str) -> f64 {
    if instrument.contains("JPY") || instrument.starts_with("XAU") || instrument.starts_with("XAG") {
        1_000.0
    } else {
        100_000.0
    }
}

/// Start of every UTC hour intersecting the half-open window.
fn hours_in(window: &TimeWindow) -> Vec<DateTime<Utc>> {
    if window.is_empty() {
        return Vec::new();
    }
    let mut hour = day_start(window.start) + Duration::hours(i64::from(window.start.hour()));
    let mut hours = Vec::new();
    while hour < window.end {
        hours.push(hour);
        hour += Duration::hours(1);
    }
    hours
}

/// Decompress and decode one hourly `.bi5` payload.
pub fn decode_hour(hour: DateTime<Utc>, compressed: &[u8], scale: f64) -> Result<Vec<Tick>, DataError> {
    if compressed.is_empty() {
        return Ok(Vec::new());
    }

    let mut raw = Vec::new();
    lzma_rs::lzma_decompress(&mut Cursor::new(compressed), &mut raw)
        .map_err(|e| DataError::Decode(format!("lzma for hour {hour}: {e:?}")))?;

    if raw.len() % RECORD_LEN != 0 {
        return Err(DataError::Decode(format!(
            "hour {hour}: {} bytes is not a whole number of {RECORD_LEN}-byte records",
            raw.len()
        )));
    }

    Ok(raw
        .chunks_exact(RECORD_LEN)
        .map(|rec| {
            let offset_ms = be_u32(rec, 0);
            let ask = f64::from(be_u32(rec, 4)) / scale;
            let bid = f64::from(be_u32(rec, 8)) / scale;
            let ask_volume = round_volume(f32::from_bits(be_u32(rec, 12)));
            let bid_volume = round_volume(f32::from_bits(be_u32(rec, 16)));
            Tick::new(
                hour + Duration::milliseconds(i64::from(offset_ms)),
                bid,
                ask,
                bid_volume,
                ask_volume,
            )
        })
        .collect())
}

fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Volumes are stored as f32; trim the widening noise (0.54f32 → 0.54).
fn round_volume(v: f32) -> f64 {
    (f64::from(v) * 1e6).round() / 1e6
}
