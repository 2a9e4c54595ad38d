//! Progress reporting for export runs.

use super::pipeline::{ExportReport, SymbolOutcome, SymbolReport};
use crate::config::{ExportTimezone, SymbolPair};
use crate::domain::TimeWindow;

/// Progress callback for export runs.
pub trait ExportProgress: Send {
    /// Called before a symbol is reconciled.
    fn on_start(&self, pair: &SymbolPair, index: usize, total: usize, window: &TimeWindow, tz: ExportTimezone);

    /// Called once a symbol has been exported, skipped or has failed.
    fn on_outcome(&self, report: &SymbolReport, index: usize, total: usize);

    /// Called when every symbol has been processed.
    fn on_run_complete(&self, report: &ExportReport);
}

/// Human-readable progress on stdout.
pub struct StdoutProgress;

impl ExportProgress for StdoutProgress {
    fn on_start(&self, pair: &SymbolPair, index: usize, total: usize, window: &TimeWindow, tz: ExportTimezone) {
        println!("\n{}", "=".repeat(50));
        println!(
            "[{}/{}] Processing {} -> {} (timezone {tz})",
            index + 1,
            total,
            pair.source,
            pair.export
        );
        println!("Required data range: {window}");
    }

    fn on_outcome(&self, report: &SymbolReport, _index: usize, _total: usize) {
        match report.last_cached {
            Some(ts) => println!("  Found local data up to {}", ts.format("%Y-%m-%d %H:%M:%S%.3f UTC")),
            None => println!("  No local data found for this range."),
        }

        match &report.outcome {
            SymbolOutcome::Exported {
                path,
                rows,
                first,
                last,
                fetched,
            } => {
                match fetched {
                    Some(n) => println!("  Fetched {n} ticks from the provider"),
                    None => println!("  Local data is up-to-date. No download needed."),
                }
                println!("  Saved {rows} rows to {}", path.display());
                println!("  First timestamp: {}", first.format("%Y-%m-%d %H:%M:%S%.3f %:z"));
                println!("  Last timestamp:  {}", last.format("%Y-%m-%d %H:%M:%S%.3f %:z"));
            }
            SymbolOutcome::Empty => println!(
                "  No data available for {} in the total specified range.",
                report.pair.source
            ),
            SymbolOutcome::Failed { reason } => {
                println!("  FAIL: {}: {reason}", report.pair.source)
            }
        }
    }

    fn on_run_complete(&self, report: &ExportReport) {
        println!(
            "\nExport complete: {}/{} exported, {} empty, {} failed",
            report.exported(),
            report.total(),
            report.empty(),
            report.failed()
        );
    }
}

/// Discards all progress events.
pub struct SilentProgress;

impl ExportProgress for SilentProgress {
    fn on_start(&self, _: &SymbolPair, _: usize, _: usize, _: &TimeWindow, _: ExportTimezone) {}
    fn on_outcome(&self, _: &SymbolReport, _: usize, _: usize) {}
    fn on_run_complete(&self, _: &ExportReport) {}
}
