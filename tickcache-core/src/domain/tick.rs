//! Tick — the fundamental market data unit.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A single bid/ask quote event for one symbol.
///
/// Ticks are immutable once fetched. Ordering and identity inside a
/// partition are by `timestamp` alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
}

impl Tick {
    pub fn new(timestamp: DateTime<Utc>, bid: f64, ask: f64, bid_volume: f64, ask_volume: f64) -> Self {
        Self {
            timestamp,
            bid,
            ask,
            bid_volume,
            ask_volume,
        }
    }

    /// Re-express this tick's instant in an export timezone.
    pub fn in_zone(&self, tz: Tz) -> ZonedTick {
        ZonedTick {
            timestamp: tz.from_utc_datetime(&self.timestamp.naive_utc()),
            bid: self.bid,
            ask: self.ask,
            bid_volume: self.bid_volume,
            ask_volume: self.ask_volume,
        }
    }
}

/// A tick whose timestamp has been converted into an export timezone.
///
/// The instant is unchanged; only its wall-clock rendering differs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonedTick {
    pub timestamp: DateTime<Tz>,
    pub bid: f64,
    pub ask: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
}
