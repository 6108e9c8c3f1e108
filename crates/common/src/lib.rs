//! Modular runtime utilities shared across SuiteGate crates.
//!
//! # Safety and Quality
//!
//! This crate enforces strict safety and quality standards to ensure
//! reliability across all SuiteGate components.
//!
//! Everything here is generic: no crate in this module knows about
//! credentials, sessions, or remote services. The gateway's business crates
//! inject their own key, value, and error types.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod resilience;
pub mod time;

// Re-export commonly used types and traits for convenience
pub use cache::{CacheConfig, CacheStats, CacheStatsSnapshot, SingleFlightCache};
pub use resilience::{
    BackoffStrategy, ConcurrencyLimiter, Jitter, LimiterError, LimiterPermit, RetryDecision,
    RetryPolicy, RetrySchedule, RetryScheduleBuilder, ScheduleError,
};
pub use time::{Clock, MockClock, SystemClock};
