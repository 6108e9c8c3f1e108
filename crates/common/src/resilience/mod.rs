//! Resilience primitives for outbound remote calls
//!
//! Backoff scheduling with jitter for retry loops, and a semaphore-based
//! concurrency limiter that keeps a burst of dashboard refreshes from
//! stampeding a rate-limited remote.

pub mod limiter;
pub mod retry;

pub use limiter::{ConcurrencyLimiter, LimiterError, LimiterPermit};
pub use retry::{
    BackoffStrategy, Jitter, RetryDecision, RetryPolicy, RetrySchedule, RetryScheduleBuilder,
    ScheduleError,
};
