//! tickcache CLI — export and cache management commands.
//!
//! Commands:
//! - `export` — reconcile the tick cache with Dukascopy and write timezone-converted CSVs
//! - `cache status` — report cached symbols, partitions, row counts and sizes

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tickcache_core::config::{ExportConfig, SymbolPair};
use tickcache_core::data::{CacheStatus, DukascopyProvider, PartitionCache};
use tickcache_core::export::{ExportPipeline, StdoutProgress, SymbolOutcome};
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "tickcache",
    about = "tickcache — cached tick history with timezone-converted CSV exports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the tick cache and write one CSV per symbol.
    Export {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Months of history ending now. Overrides the config file.
        #[arg(long)]
        months: Option<u32>,

        /// Output directory holding raw_cache/ and processed_data/. Overrides the config file.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// IANA timezone for exported timestamps, e.g. Europe/Helsinki.
        #[arg(long)]
        timezone: Option<String>,

        /// Symbol pair SOURCE=EXPORT (e.g. EUR/USD=EURUSD). Repeatable; replaces configured symbols.
        #[arg(long = "symbol", value_name = "SOURCE=EXPORT")]
        symbols: Vec<SymbolPair>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, partitions, rows and sizes.
    Status {
        /// Output directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tickcache=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            config,
            months,
            output_dir,
            timezone,
            symbols,
        } => run_export(config, months, output_dir, timezone, symbols),
        Commands::Cache { action } => match action {
            CacheAction::Status { output_dir, json } => run_cache_status(&output_dir, json),
        },
    }
}

fn run_export(
    config_path: Option<PathBuf>,
    months: Option<u32>,
    output_dir: Option<PathBuf>,
    timezone: Option<String>,
    symbols: Vec<SymbolPair>,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => ExportConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExportConfig::new(1, Vec::new(), "data"),
    };

    if let Some(months) = months {
        config.months = months;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    if !symbols.is_empty() {
        config.symbols = symbols;
    }
    if let Some(name) = timezone {
        if let Err(e) = config.set_timezone(&name) {
            warn!("{e}; keeping {}", config.timezone());
        }
    }
    config
        .validate()
        .context("nothing to export: pass --symbol or list [[symbols]] in --config")?;

    println!("Using broker timezone: {}", config.timezone());

    let provider = DukascopyProvider::new()?;
    let report = ExportPipeline::new(&config, &provider).run(Utc::now(), &StdoutProgress);

    if report.failed() > 0 {
        for symbol in &report.symbols {
            if let SymbolOutcome::Failed { reason } = &symbol.outcome {
                eprintln!("Error for {}: {reason}", symbol.pair.source);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_cache_status(output_dir: &Path, json: bool) -> Result<()> {
    let cache = PartitionCache::under_output_dir(output_dir);
    let statuses = cache
        .status()
        .with_context(|| format!("reading cache at {}", cache.root().display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    if !cache.root().exists() {
        println!("Cache directory does not exist: {}", cache.root().display());
        return Ok(());
    }
    if statuses.is_empty() {
        println!("Cache is empty: {}", cache.root().display());
        return Ok(());
    }

    let total_size: u64 = statuses.iter().map(|s| s.bytes).sum();

    println!("Cache: {}", cache.root().display());
    println!("Symbols: {}", statuses.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<10} {:<20} {:>10} {:>12} {:<24} {:>10}",
        "Symbol", "Months", "Partitions", "Rows", "Last tick (UTC)", "Size"
    );
    println!("{}", "-".repeat(91));
    for status in &statuses {
        println!(
            "{:<10} {:<20} {:>10} {:>12} {:<24} {:>10}",
            status.symbol_dir,
            month_range(status),
            status.partitions,
            status.rows,
            status
                .last_timestamp
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".into()),
            format_size(status.bytes)
        );
        if status.corrupt_partitions > 0 {
            println!("  WARNING: {} unreadable partition(s)", status.corrupt_partitions);
        }
    }

    Ok(())
}

fn month_range(status: &CacheStatus) -> String {
    match (status.first_partition, status.last_partition) {
        (Some(first), Some(last)) if first == last => first.to_string(),
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "(none)".into(),
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
