//! Pure merge functions over tick sequences.
//!
//! Everything here is independent of file I/O. The reconciler and the
//! partition cache both funnel their data through these functions, so the
//! "unique, ascending timestamps" invariant is enforced in one place.

use crate::domain::{Tick, TimeWindow};
use chrono::{DateTime, Utc};

/// Sort by timestamp and collapse equal timestamps, keeping the last occurrence.
///
/// The sort is stable, so "last" means last in input order.
pub fn normalize(mut ticks: Vec<Tick>) -> Vec<Tick> {
    ticks.sort_by_key(|t| t.timestamp);
    let mut out: Vec<Tick> = Vec::with_capacity(ticks.len());
    for tick in ticks {
        match out.last_mut() {
            Some(last) if last.timestamp == tick.timestamp => *last = tick,
            _ => out.push(tick),
        }
    }
    out
}

/// Union of two tick sets; on timestamp conflict the tick from `newer` wins.
///
/// Neither input needs to be sorted or duplicate-free. The result is sorted
/// ascending with unique timestamps.
pub fn merge_newest_wins(older: Vec<Tick>, newer: Vec<Tick>) -> Vec<Tick> {
    let mut all = older;
    all.extend(newer);
    normalize(all)
}

/// Keep only ticks inside the window, both ends inclusive.
pub fn clip(ticks: Vec<Tick>, window: &TimeWindow) -> Vec<Tick> {
    ticks.into_iter().filter(|t| window.covers(t.timestamp)).collect()
}

/// Split a sorted sequence into `(< boundary, >= boundary)`.
pub fn split_at(mut ticks: Vec<Tick>, boundary: DateTime<Utc>) -> (Vec<Tick>, Vec<Tick>) {
    let idx = ticks.partition_point(|t| t.timestamp < boundary);
    let tail = ticks.split_off(idx);
    (ticks, tail)
}

/// True if timestamps are strictly ascending.
pub fn is_strictly_sorted(ticks: &[Tick]) -> bool {
    ticks.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 25, 10, 0, 0).unwrap()
    }

    fn tick_at(minutes: i64, bid: f64) -> Tick {
        Tick::new(base() + Duration::minutes(minutes), bid, bid + 0.0002, 1.0, 1.0)
    }

    #[test]
    fn normalize_sorts_and_keeps_last_duplicate() {
        let ticks = vec![tick_at(5, 1.0), tick_at(1, 2.0), tick_at(5, 3.0)];
        let out = normalize(ticks);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].bid, 2.0);
        assert_eq!(out[1].bid, 3.0);
        assert!(is_strictly_sorted(&out));
    }

    #[test]
    fn newer_value_wins_on_conflict() {
        let older = vec![tick_at(0, 1.0), tick_at(1, 1.0)];
        let newer = vec![tick_at(1, 9.0), tick_at(2, 9.0)];
        let out = merge_newest_wins(older, newer);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].bid, 1.0);
        assert_eq!(out[1].bid, 9.0);
        assert_eq!(out[2].bid, 9.0);
    }

    #[test]
    fn merge_with_empty_side() {
        let ticks = vec![tick_at(3, 1.0), tick_at(2, 1.0)];
        assert_eq!(merge_newest_wins(Vec::new(), ticks.clone()).len(), 2);
        assert_eq!(merge_newest_wins(ticks, Vec::new()).len(), 2);
        assert!(merge_newest_wins(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn clip_keeps_both_endpoints() {
        let ticks = vec![tick_at(0, 1.0), tick_at(1, 1.0), tick_at(2, 1.0), tick_at(3, 1.0)];
        let window = TimeWindow::new(base() + Duration::minutes(1), base() + Duration::minutes(2));
        let out = clip(ticks, &window);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, base() + Duration::minutes(1));
        assert_eq!(out[1].timestamp, base() + Duration::minutes(2));
    }

    #[test]
    fn split_at_boundary_puts_boundary_tick_in_tail() {
        let ticks = vec![tick_at(0, 1.0), tick_at(1, 1.0), tick_at(2, 1.0)];
        let (head, tail) = split_at(ticks, base() + Duration::minutes(1));

        assert_eq!(head.len(), 1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].timestamp, base() + Duration::minutes(1));
    }
}
