//! Gateway constants
//!
//! Centralized location for all domain-level constants used throughout the
//! gateway.

// Cache TTL defaults per category (seconds)
pub const DEFAULT_STATIC_TTL_SECS: u64 = 1800;
pub const DEFAULT_USER_TTL_SECS: u64 = 900;
pub const DEFAULT_REPORT_TTL_SECS: u64 = 300;

// Session lifetime safety margin subtracted from the remote-declared ticket
// lifetime, so calls never ride a ticket into its expiry window.
pub const SESSION_SAFETY_MARGIN_SECS: u64 = 300;

// Retry budgets by failure class
pub const DEFAULT_THROTTLE_ATTEMPTS: u32 = 5;
pub const DEFAULT_NETWORK_ATTEMPTS: u32 = 3;

// Exponential backoff shape
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_BACKOFF_BASE: f64 = 2.0;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 30;

// Concurrency limiting
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 4;
pub const DEFAULT_PERMIT_WAIT_SECS: u64 = 10;
