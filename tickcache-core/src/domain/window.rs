//! Time windows and calendar-month partition keys.

use chrono::{DateTime, Datelike, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// UTC interval between `start` and `end`.
///
/// Provider requests treat it as half-open `[start, end)` ([`TimeWindow::contains`]).
/// The desired export range is closed at both ends ([`TimeWindow::covers`]), so a
/// cached tick stamped exactly at the run's `now` still counts as cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window covering the `months` calendar months that end at `now`.
    ///
    /// Month subtraction clamps to the last valid day (Mar 31 − 1 month = Feb 28/29).
    pub fn trailing_months(now: DateTime<Utc>, months: u32) -> Self {
        let start = now
            .checked_sub_months(Months::new(months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(start, now)
    }

    /// Half-open membership, `[start, end)`.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Closed membership, `[start, end]`.
    pub fn covers(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Calendar-month partitions touched by this window, in ascending order.
    pub fn partitions(&self) -> Vec<PartitionKey> {
        if self.is_empty() {
            return Vec::new();
        }
        let last = PartitionKey::of(self.end);
        let mut keys = Vec::new();
        let mut key = PartitionKey::of(self.start);
        while key <= last {
            keys.push(key);
            key = key.next();
        }
        keys
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} UTC",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Truncate an instant to 00:00:00 UTC of its calendar day.
pub fn day_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// One calendar month (UTC), identifying a cache partition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
}

impl PartitionKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The partition a timestamp belongs to.
    pub fn of(ts: DateTime<Utc>) -> Self {
        Self::new(ts.year(), ts.month())
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}
