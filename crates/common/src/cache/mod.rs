//! TTL response caching with single-flight computation
//!
//! The cache stores already-computed values with a per-insert TTL and
//! coalesces concurrent misses for the same key into one computation. Keys
//! lock independently: a slow computation for one key never blocks reads or
//! writes for any other key.

pub mod config;
pub mod core;
pub mod stats;

pub use config::CacheConfig;
pub use core::SingleFlightCache;
pub use stats::{CacheStats, CacheStatsSnapshot};
