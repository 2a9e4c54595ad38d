//! Export orchestrator — reconciles each configured symbol and writes its export.

use super::progress::ExportProgress;
use super::writer::{export_path, write_export};
use crate::config::{ExportConfig, ExportTimezone, SymbolPair};
use crate::data::cache::PartitionCache;
use crate::data::provider::TickProvider;
use crate::data::reconcile::CacheReconciler;
use crate::domain::TimeWindow;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::path::PathBuf;
use tracing::{error, info};

/// What happened to one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    /// An export file was written.
    Exported {
        path: PathBuf,
        rows: usize,
        first: DateTime<Tz>,
        last: DateTime<Tz>,
        /// Ticks returned by the provider, `None` when the cache was current.
        fetched: Option<usize>,
    },
    /// No ticks in the desired window; nothing written.
    Empty,
    /// Fetching, caching or writing failed.
    Failed { reason: String },
}

/// Outcome for one (source, export) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolReport {
    pub pair: SymbolPair,
    /// Newest cached timestamp inside the window before this run touched the cache.
    pub last_cached: Option<DateTime<Utc>>,
    pub outcome: SymbolOutcome,
}

/// Summary of a full export run.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub window: TimeWindow,
    pub timezone: ExportTimezone,
    pub run_date: NaiveDate,
    pub symbols: Vec<SymbolReport>,
}

impl ExportReport {
    pub fn total(&self) -> usize {
        self.symbols.len()
    }

    pub fn exported(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Exported { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Failed { .. }))
    }

    pub fn all_exported(&self) -> bool {
        self.exported() == self.total()
    }

    fn count(&self, pred: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.symbols.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Runs reconciliation and export for every configured symbol, in order.
pub struct ExportPipeline<'a> {
    config: &'a ExportConfig,
    provider: &'a dyn TickProvider,
    cache: PartitionCache,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(config: &'a ExportConfig, provider: &'a dyn TickProvider) -> Self {
        Self {
            config,
            provider,
            cache: PartitionCache::under_output_dir(&config.output_dir),
        }
    }

    /// Export every symbol for the window of `config.months` months ending at `now`.
    ///
    /// The window is computed once and shared by all symbols. The run date in
    /// file names is `now`'s calendar date in the export timezone. A failure on
    /// one symbol is recorded and the loop moves on.
    pub fn run(&self, now: DateTime<Utc>, progress: &dyn ExportProgress) -> ExportReport {
        let window = TimeWindow::trailing_months(now, self.config.months);
        let timezone = self.config.timezone();
        let run_date = now.with_timezone(&timezone.tz()).date_naive();
        let total = self.config.symbols.len();

        info!(window = %window, timezone = %timezone, symbols = total, "starting export run");

        let mut symbols = Vec::with_capacity(total);
        for (i, pair) in self.config.symbols.iter().enumerate() {
            progress.on_start(pair, i, total, &window, timezone);
            let report = self.export_symbol(pair, &window, timezone, run_date);
            progress.on_outcome(&report, i, total);
            symbols.push(report);
        }

        let report = ExportReport {
            window,
            timezone,
            run_date,
            symbols,
        };
        progress.on_run_complete(&report);
        report
    }

    fn export_symbol(
        &self,
        pair: &SymbolPair,
        window: &TimeWindow,
        timezone: ExportTimezone,
        run_date: NaiveDate,
    ) -> SymbolReport {
        let reconciler = CacheReconciler::new(&self.cache);
        let plan = reconciler.plan(&pair.source, window);
        let last_cached = plan.last_cached;
        let report = |outcome| SymbolReport {
            pair: pair.clone(),
            last_cached,
            outcome,
        };

        let reconciled = match reconciler.execute(self.provider, &pair.source, window, plan) {
            Ok(r) => r,
            Err(e) => {
                error!(symbol = %pair.source, "error fetching data: {e}");
                return report(SymbolOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        };

        let (Some(first), Some(last)) = (reconciled.ticks.first(), reconciled.ticks.last()) else {
            info!(symbol = %pair.source, "no data available in the requested range, nothing exported");
            return report(SymbolOutcome::Empty);
        };
        let (first, last) = (
            first.timestamp.with_timezone(&timezone.tz()),
            last.timestamp.with_timezone(&timezone.tz()),
        );

        let path = export_path(&self.config.output_dir, &pair.export, timezone, run_date);
        if let Err(e) = write_export(&path, &reconciled.ticks, timezone) {
            error!(symbol = %pair.source, path = %path.display(), "failed to write export: {e}");
            return report(SymbolOutcome::Failed {
                reason: e.to_string(),
            });
        }

        info!(
            symbol = %pair.source,
            rows = reconciled.ticks.len(),
            path = %path.display(),
            "saved processed data"
        );
        report(SymbolOutcome::Exported {
            path,
            rows: reconciled.ticks.len(),
            first,
            last,
            fetched: reconciled.fetched().then_some(reconciled.fetched_count),
        })
    }
}
