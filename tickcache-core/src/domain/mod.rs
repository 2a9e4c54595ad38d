//! Domain types for tickcache

pub mod tick;
pub mod window;

pub use tick::{Tick, ZonedTick};
pub use window::{day_start, PartitionKey, TimeWindow};
