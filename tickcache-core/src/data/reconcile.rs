//! Cache reconciliation: how much of the cache to trust and what to re-fetch.
//!
//! The most recent cached day is presumed incomplete (it may have been fetched
//! mid-day), so every run re-derives a safe boundary: the UTC start of the day
//! holding the newest cached tick. Cached ticks before that boundary are reused
//! as-is; everything from the boundary to the end of the desired window is
//! fetched again and merged back into the cache.

use super::cache::PartitionCache;
use super::merge;
use super::provider::{DataError, FetchRequest, TickProvider};
use crate::domain::{day_start, Tick, TimeWindow};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// What the cache already covers and what must be fetched.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    /// Cached ticks strictly before the safe boundary, sorted and unique.
    pub clean: Vec<Tick>,
    /// Newest cached timestamp inside the desired window, if any.
    pub last_cached: Option<DateTime<Utc>>,
    /// Number of cached ticks inside the desired window before truncation.
    pub cached_count: usize,
    /// Window to request from the provider; `None` when the cache is current.
    pub fetch_window: Option<TimeWindow>,
}

impl ReconcilePlan {
    pub fn needs_fetch(&self) -> bool {
        self.fetch_window.is_some()
    }
}

/// Result of reconciling one symbol.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Final dataset: clean cache plus fetched ticks, clipped to the desired window.
    pub ticks: Vec<Tick>,
    pub plan: ReconcilePlan,
    /// Ticks returned by the provider (before clipping), 0 if no fetch happened.
    pub fetched_count: usize,
}

impl Reconciled {
    pub fn fetched(&self) -> bool {
        self.plan.needs_fetch()
    }
}

/// Reconciles the local partition cache with a remote provider, one symbol at a time.
pub struct CacheReconciler<'a> {
    cache: &'a PartitionCache,
}

impl<'a> CacheReconciler<'a> {
    pub fn new(cache: &'a PartitionCache) -> Self {
        Self { cache }
    }

    /// Decide which cached ticks are clean and which window must be re-fetched.
    pub fn plan(&self, symbol: &str, window: &TimeWindow) -> ReconcilePlan {
        let local = self.cache.load_window(symbol, window);
        plan_from_local(local, window)
    }

    /// Plan, fetch, persist and merge for one symbol.
    pub fn reconcile(
        &self,
        provider: &dyn TickProvider,
        symbol: &str,
        window: &TimeWindow,
    ) -> Result<Reconciled, DataError> {
        let plan = self.plan(symbol, window);
        self.execute(provider, symbol, window, plan)
    }

    /// Carry out a plan: fetch the suspect range, persist it, merge with the clean set.
    ///
    /// A provider failure is returned to the caller untouched; nothing is
    /// written to the cache in that case.
    pub fn execute(
        &self,
        provider: &dyn TickProvider,
        symbol: &str,
        window: &TimeWindow,
        plan: ReconcilePlan,
    ) -> Result<Reconciled, DataError> {
        let Some(fetch_window) = plan.fetch_window else {
            info!(symbol, "local data is up to date, no download needed");
            let ticks = merge::clip(plan.clean.clone(), window);
            return Ok(Reconciled {
                ticks,
                plan,
                fetched_count: 0,
            });
        };

        let request = FetchRequest::ticks(symbol, fetch_window);
        debug!(symbol, provider = provider.name(), window = %fetch_window, "fetching ticks");
        let fetched = merge::normalize(provider.fetch(&request)?);
        let fetched_count = fetched.len();

        if !fetched.is_empty() {
            let touched = self.cache.write(symbol, &fetched)?;
            info!(
                symbol,
                partitions = touched.len(),
                path = %self.cache.symbol_dir(symbol).display(),
                "saved/updated raw data in cache"
            );
        }

        let merged = merge::merge_newest_wins(plan.clean.clone(), fetched);
        Ok(Reconciled {
            ticks: merge::clip(merged, window),
            plan,
            fetched_count,
        })
    }
}

/// Pure planning step over already-loaded cache contents.
///
/// `local` must be sorted, unique, and restricted to `window`
/// (as returned by [`PartitionCache::load_window`]). The newest cached tick can
/// sit exactly on `window.end`; when its day starts there, nothing is fetched.
pub fn plan_from_local(local: Vec<Tick>, window: &TimeWindow) -> ReconcilePlan {
    let cached_count = local.len();
    let Some(last_cached) = local.last().map(|t| t.timestamp) else {
        return ReconcilePlan {
            clean: Vec::new(),
            last_cached: None,
            cached_count,
            fetch_window: (!window.is_empty()).then_some(*window),
        };
    };

    let boundary = day_start(last_cached);
    let (clean, _suspect) = merge::split_at(local, boundary);
    let fetch_window = (boundary < window.end).then(|| TimeWindow::new(boundary, window.end));

    ReconcilePlan {
        clean,
        last_cached: Some(last_cached),
        cached_count,
        fetch_window,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn tick(ts: DateTime<Utc>) -> Tick {
        Tick::new(ts, 1.1, 1.1002, 1.0, 1.0)
    }

    fn window() -> TimeWindow {
        TimeWindow::new(utc(2025, 4, 1, 12, 0), utc(2025, 5, 1, 12, 0))
    }

    /// Serves a fixed set of ticks and counts calls.
    struct FixedProvider {
        ticks: Vec<Tick>,
        calls: std::cell::Cell<usize>,
    }

    impl TickProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(&self, request: &FetchRequest) -> Result<Vec<Tick>, DataError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self
                .ticks
                .iter()
                .filter(|t| request.window.contains(t.timestamp))
                .copied()
                .collect())
        }
    }

    struct DownProvider;

    impl TickProvider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        fn fetch(&self, _: &FetchRequest) -> Result<Vec<Tick>, DataError> {
            Err(DataError::Network("connection refused".into()))
        }
    }

    #[test]
    fn reconcile_merges_fetched_into_clean_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PartitionCache::new(dir.path());
        cache
            .write("EUR/USD", &[tick(utc(2025, 4, 20, 9, 0)), tick(utc(2025, 4, 25, 10, 0))])
            .unwrap();
        // Unsorted with a duplicate; the reconciler normalizes it.
        let provider = FixedProvider {
            ticks: vec![
                tick(utc(2025, 4, 28, 8, 0)),
                tick(utc(2025, 4, 25, 11, 0)),
                tick(utc(2025, 4, 28, 8, 0)),
            ],
            calls: Default::default(),
        };

        let reconciled = CacheReconciler::new(&cache)
            .reconcile(&provider, "EUR/USD", &window())
            .unwrap();

        assert!(reconciled.fetched());
        assert_eq!(reconciled.fetched_count, 2);
        assert_eq!(
            reconciled.ticks.iter().map(|t| t.timestamp).collect::<Vec<_>>(),
            vec![utc(2025, 4, 20, 9, 0), utc(2025, 4, 25, 11, 0), utc(2025, 4, 28, 8, 0)]
        );
        assert!(merge::is_strictly_sorted(&reconciled.ticks));

        let window_ticks = cache.load_window("EUR/USD", &window());
        assert_eq!(window_ticks.len(), 4);
    }

    #[test]
    fn reconcile_without_fetch_does_not_call_provider() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PartitionCache::new(dir.path());
        let w = TimeWindow::new(utc(2025, 4, 1, 0, 0), utc(2025, 4, 25, 0, 0));
        cache
            .write("EUR/USD", &[tick(utc(2025, 4, 24, 9, 0)), tick(utc(2025, 4, 25, 0, 0))])
            .unwrap();
        let provider = FixedProvider {
            ticks: Vec::new(),
            calls: Default::default(),
        };

        let reconciled = CacheReconciler::new(&cache)
            .reconcile(&provider, "EUR/USD", &w)
            .unwrap();

        assert_eq!(provider.calls.get(), 0);
        assert!(!reconciled.fetched());
        assert_eq!(reconciled.ticks, vec![tick(utc(2025, 4, 24, 9, 0))]);
    }

    #[test]
    fn provider_failure_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PartitionCache::new(dir.path());

        let result = CacheReconciler::new(&cache).reconcile(&DownProvider, "EUR/USD", &window());

        assert!(matches!(result, Err(DataError::Network(_))));
        assert!(!cache.symbol_dir("EUR/USD").exists());
    }

    #[test]
    fn empty_cache_fetches_whole_window() {
        let plan = plan_from_local(Vec::new(), &window());
        assert!(plan.clean.is_empty());
        assert_eq!(plan.last_cached, None);
        assert_eq!(plan.fetch_window, Some(window()));
    }

    #[test]
    fn empty_window_never_fetches() {
        let now = utc(2025, 5, 1, 12, 0);
        let plan = plan_from_local(Vec::new(), &TimeWindow::new(now, now));
        assert!(!plan.needs_fetch());
    }

    #[test]
    fn partial_last_day_is_refetched_from_midnight() {
        let local = vec![
            tick(utc(2025, 4, 24, 9, 0)),
            tick(utc(2025, 4, 25, 10, 0)),
            tick(utc(2025, 4, 25, 12, 0)),
        ];
        let plan = plan_from_local(local, &window());

        assert_eq!(plan.last_cached, Some(utc(2025, 4, 25, 12, 0)));
        assert_eq!(plan.cached_count, 3);
        assert_eq!(plan.clean, vec![tick(utc(2025, 4, 24, 9, 0))]);
        assert_eq!(
            plan.fetch_window,
            Some(TimeWindow::new(utc(2025, 4, 25, 0, 0), window().end))
        );
    }

    #[test]
    fn tick_exactly_at_midnight_is_suspect() {
        let local = vec![tick(utc(2025, 4, 25, 0, 0))];
        let plan = plan_from_local(local, &window());
        assert!(plan.clean.is_empty());
        assert_eq!(plan.fetch_window.unwrap().start, utc(2025, 4, 25, 0, 0));
    }

    #[test]
    fn cache_reaching_window_end_skips_fetch() {
        // Window ends at midnight and the cache holds a tick stamped exactly then.
        let w = TimeWindow::new(utc(2025, 4, 1, 0, 0), utc(2025, 4, 25, 0, 0));
        let local = vec![tick(utc(2025, 4, 24, 23, 0)), tick(utc(2025, 4, 25, 0, 0))];
        let plan = plan_from_local(local, &w);

        assert!(!plan.needs_fetch());
        assert_eq!(plan.clean, vec![tick(utc(2025, 4, 24, 23, 0))]);
    }

    #[test]
    fn last_tick_just_before_end_still_fetches_its_day() {
        let w = TimeWindow::new(utc(2025, 4, 1, 0, 0), utc(2025, 4, 25, 0, 0));
        let local = vec![tick(utc(2025, 4, 25, 0, 0) - Duration::nanoseconds(1))];
        let plan = plan_from_local(local, &w);

        assert_eq!(
            plan.fetch_window,
            Some(TimeWindow::new(utc(2025, 4, 24, 0, 0), w.end))
        );
    }
}
