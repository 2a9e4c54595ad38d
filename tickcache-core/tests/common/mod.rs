//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tickcache_core::data::{DataError, FetchRequest, TickProvider};
use tickcache_core::domain::Tick;

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn tick(ts: DateTime<Utc>, bid: f64) -> Tick {
    Tick::new(ts, bid, bid + 0.0002, 1.0, 1.5)
}

/// In-memory provider serving fixed ticks per symbol.
///
/// Every request is recorded; symbols marked as failing return a network error.
#[derive(Default)]
pub struct ScriptedProvider {
    remote: HashMap<String, Vec<Tick>>,
    failing: HashSet<String>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticks(mut self, symbol: &str, ticks: Vec<Tick>) -> Self {
        self.remote.insert(symbol.to_string(), ticks);
        self
    }

    pub fn failing_for(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TickProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<Vec<Tick>, DataError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.failing.contains(&request.symbol) {
            return Err(DataError::Network(format!("{} unreachable", request.symbol)));
        }
        Ok(self
            .remote
            .get(&request.symbol)
            .map(|ticks| {
                ticks
                    .iter()
                    .filter(|t| request.window.contains(t.timestamp))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}
