//! Concurrency limiting for outbound calls
//!
//! Caps the number of simultaneous in-flight operations against one
//! downstream, so a burst of dashboard refreshes queues locally instead of
//! tripping the remote's rate limiter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

/// Errors from permit acquisition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LimiterError {
    /// No permit became available within the acquire timeout
    #[error("no capacity after waiting {waited:?}")]
    Saturated { waited: Duration },
    /// The limiter was closed while waiting
    #[error("limiter closed")]
    Closed,
}

/// Permit for one in-flight operation. Capacity returns on drop.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

/// Semaphore-backed limiter for concurrent operations
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    acquire_timeout: Duration,
    timeout_count: Arc<AtomicU64>,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `max_concurrent` simultaneous operations.
    ///
    /// `acquire_timeout` bounds how long a caller queues for a permit.
    #[must_use]
    pub fn new(max_concurrent: usize, acquire_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            max_concurrent: max_concurrent.max(1),
            acquire_timeout,
            timeout_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquire a permit, waiting up to the configured timeout.
    pub async fn acquire(&self) -> Result<LimiterPermit, LimiterError> {
        let acquired = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await;

        match acquired {
            Ok(Ok(permit)) => Ok(LimiterPermit { _permit: permit }),
            Ok(Err(_)) => Err(LimiterError::Closed),
            Err(_) => {
                self.timeout_count.fetch_add(1, Ordering::Relaxed);
                warn!(
                    max_concurrent = self.max_concurrent,
                    waited_ms = self.acquire_timeout.as_millis() as u64,
                    "limiter saturated, rejecting caller"
                );
                Err(LimiterError::Saturated {
                    waited: self.acquire_timeout,
                })
            }
        }
    }

    /// Permits currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of callers rejected on timeout since construction.
    #[must_use]
    pub fn timeout_count(&self) -> u64 {
        self.timeout_count.load(Ordering::Relaxed)
    }
}
