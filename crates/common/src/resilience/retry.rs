//! Retry scheduling with backoff strategies and jitter
//!
//! The schedule is pure arithmetic: callers own their retry loop (attempt
//! counting, audit hooks, reauthentication) and ask the schedule what delay
//! to apply before the next attempt. Policy decisions are expressed through
//! the [`RetryPolicy`] trait so the error type stays with the caller.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

/// Invalid retry schedule configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid retry schedule: {message}")]
    Invalid { message: String },
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the schedule's backoff delay
    Retry,
    /// Retry the operation after a server-dictated delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried and optionally provide a
    /// custom delay. `attempt` is the 1-based number of the attempt that just
    /// failed.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: initial_delay * base^attempt, capped at max_delay
    Exponential {
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    },
}

impl BackoffStrategy {
    /// Calculate the raw delay before the given 0-based retry number.
    #[must_use]
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential {
                initial_delay,
                base,
                max_delay,
            } => {
                let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay_ms = (initial_delay.as_millis() as f64) * base.powi(exp);
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Jitter type for adding randomness to retry delays
///
/// Jitter only ever shrinks a delay, so the strategy's cap is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Full jitter: uniform in [0, delay]
    Full,
    /// Equal jitter: uniform in [delay/2, delay]
    Equal,
}

impl Jitter {
    /// Apply jitter to the calculated delay
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if delay_ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(rng.gen_range(0..=delay_ms)),
            Self::Equal => {
                let half = delay_ms / 2;
                Duration::from_millis(half + rng.gen_range(0..=delay_ms - half))
            }
        }
    }
}

/// Backoff schedule for a retry loop
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySchedule {
    /// Maximum number of attempts, first try included
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Jitter applied on top of the calculated delay
    pub jitter: Jitter,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(500),
                base: 2.0,
                max_delay: Duration::from_secs(30),
            },
            jitter: Jitter::Equal,
        }
    }
}

impl RetrySchedule {
    /// Create a schedule builder
    #[must_use]
    pub fn builder() -> RetryScheduleBuilder {
        RetryScheduleBuilder::new()
    }

    /// Validate the schedule
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.max_attempts == 0 {
            return Err(ScheduleError::Invalid {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }
        if let BackoffStrategy::Exponential { base, .. } = &self.backoff {
            if *base <= 0.0 {
                return Err(ScheduleError::Invalid {
                    message: "exponential base must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Jittered delay to sleep before retry number `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.jitter.apply(self.backoff.calculate_delay(attempt))
    }

    /// Whether another attempt fits in the budget after `attempts` tries.
    #[must_use]
    pub const fn allows_another(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// Builder for `RetrySchedule` with a fluent API
#[derive(Debug, Default)]
pub struct RetryScheduleBuilder {
    schedule: RetrySchedule,
}

impl RetryScheduleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schedule: RetrySchedule::default(),
        }
    }

    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.schedule.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.schedule.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    #[must_use]
    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        base: f64,
        max_delay: Duration,
    ) -> Self {
        self.schedule.backoff = BackoffStrategy::Exponential {
            initial_delay,
            base,
            max_delay,
        };
        self
    }

    #[must_use]
    pub fn no_jitter(mut self) -> Self {
        self.schedule.jitter = Jitter::None;
        self
    }

    #[must_use]
    pub fn full_jitter(mut self) -> Self {
        self.schedule.jitter = Jitter::Full;
        self
    }

    #[must_use]
    pub fn equal_jitter(mut self) -> Self {
        self.schedule.jitter = Jitter::Equal;
        self
    }

    pub fn build(self) -> Result<RetrySchedule, ScheduleError> {
        self.schedule.validate()?;
        Ok(self.schedule)
    }
}
