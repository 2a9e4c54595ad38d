//! Tick provider trait and structured error types.
//!
//! The TickProvider trait abstracts over remote tick sources (Dukascopy today)
//! so the reconciler can be driven by a scripted provider in tests.

use crate::domain::{Tick, TimeWindow};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output and per-symbol reports.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("could not decode provider payload: {0}")]
    Decode(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sampling granularity of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Interval {
    Tick,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Tick => f.write_str("tick"),
        }
    }
}

/// Which side of the book a request is priced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSide {
    Bid,
    Ask,
}

impl fmt::Display for PriceSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSide::Bid => f.write_str("bid"),
            PriceSide::Ask => f.write_str("ask"),
        }
    }
}

/// Parameters of a single provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub symbol: String,
    pub interval: Interval,
    pub side: PriceSide,
    pub window: TimeWindow,
}

impl FetchRequest {
    /// Tick request priced from the bid side, the only mode the export uses.
    pub fn ticks(symbol: &str, window: TimeWindow) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval: Interval::Tick,
            side: PriceSide::Bid,
            window,
        }
    }
}

/// Trait for remote tick sources.
///
/// Implementations handle the specifics of talking to one source.
/// The cache layer sits above this trait; providers don't know about the cache.
/// Providers may return ticks slightly outside the requested window, unsorted,
/// or with duplicate timestamps; the reconciler normalizes all of that.
pub trait TickProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch ticks for one symbol over the request window. No retries.
    fn fetch(&self, request: &FetchRequest) -> Result<Vec<Tick>, DataError>;
}
