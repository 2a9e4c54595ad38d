//! Property tests for the merge layer and reconciliation planning.
//!
//! Uses proptest to verify:
//! 1. Merged output is strictly ascending with unique timestamps
//! 2. On a timestamp conflict the newer value wins
//! 3. Merging is idempotent
//! 4. The plan never keeps a cached tick at or after the last cached day

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;
use tickcache_core::data::merge::{clip, is_strictly_sorted, merge_newest_wins, normalize};
use tickcache_core::data::reconcile::plan_from_local;
use tickcache_core::domain::{day_start, Tick, TimeWindow};

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
}

// ── Strategies (proptest) ────────────────────────────────────────────

/// Ticks on a coarse second grid over ~10 days so collisions are common.
fn arb_tick() -> impl Strategy<Value = Tick> {
    (0i64..864_000, 1.0..2.0_f64).prop_map(|(offset, bid)| {
        let bid = (bid * 100_000.0).round() / 100_000.0;
        Tick::new(origin() + Duration::seconds(offset - offset % 60), bid, bid + 0.0001, 1.0, 1.0)
    })
}

fn arb_ticks() -> impl Strategy<Value = Vec<Tick>> {
    prop::collection::vec(arb_tick(), 0..60)
}

// ── 1–3. Merge ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn merge_has_unique_ascending_timestamps(older in arb_ticks(), newer in arb_ticks()) {
        let merged = merge_newest_wins(older, newer);
        prop_assert!(is_strictly_sorted(&merged));
    }

    #[test]
    fn newer_value_wins(older in arb_ticks(), newer in arb_ticks()) {
        let merged = merge_newest_wins(older.clone(), newer.clone());

        // Last occurrence in `newer` decides, otherwise last occurrence in `older`.
        let mut expected: HashMap<DateTime<Utc>, f64> = HashMap::new();
        for t in older.iter().chain(newer.iter()) {
            expected.insert(t.timestamp, t.bid);
        }

        prop_assert_eq!(merged.len(), expected.len());
        for t in &merged {
            prop_assert_eq!(Some(&t.bid), expected.get(&t.timestamp));
        }
    }

    #[test]
    fn merge_is_idempotent(older in arb_ticks(), newer in arb_ticks()) {
        let once = merge_newest_wins(older, newer.clone());
        let twice = merge_newest_wins(once.clone(), newer);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalize_is_stable_under_repetition(ticks in arb_ticks()) {
        let once = normalize(ticks);
        prop_assert_eq!(normalize(once.clone()), once);
    }
}

// ── 4. Planning ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn plan_splits_at_last_cached_day(ticks in arb_ticks(), end_offset in 0i64..1_000_000) {
        let window = TimeWindow::new(origin(), origin() + Duration::seconds(end_offset));
        let local = clip(normalize(ticks), &window);
        let plan = plan_from_local(local.clone(), &window);

        match local.last() {
            None => prop_assert_eq!(plan.fetch_window.is_some(), !window.is_empty()),
            Some(last) => {
                let boundary = day_start(last.timestamp);
                prop_assert!(plan.clean.iter().all(|t| t.timestamp < boundary));
                prop_assert_eq!(
                    plan.clean.len(),
                    local.iter().filter(|t| t.timestamp < boundary).count()
                );
                match plan.fetch_window {
                    Some(w) => {
                        prop_assert_eq!(w.start, boundary);
                        prop_assert_eq!(w.end, window.end);
                    }
                    None => prop_assert!(boundary >= window.end),
                }
            }
        }
    }
}
