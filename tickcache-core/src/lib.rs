//! tickcache core: tick fetching, partitioned cache, reconciliation and export.
//!
//! - Domain types (ticks, time windows, month partitions)
//! - Provider trait and the Dukascopy datafeed provider
//! - Monthly CSV partition cache with merge-on-write
//! - Cache reconciliation: trust everything before the last cached day, re-fetch the rest
//! - Export pipeline writing one timezone-converted CSV per symbol
//! - TOML run configuration

pub mod config;
pub mod data;
pub mod domain;
pub mod export;
