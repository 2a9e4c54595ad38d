//! Tick fetching, caching and reconciliation

pub mod cache;
pub mod dukascopy;
pub mod merge;
pub mod provider;
pub mod reconcile;

pub use cache::{CacheStatus, PartitionCache};
pub use dukascopy::DukascopyProvider;
pub use provider::{DataError, FetchRequest, Interval, PriceSide, TickProvider};
pub use reconcile::{CacheReconciler, ReconcilePlan, Reconciled};
