//! Cache configuration

use std::time::Duration;

/// Configuration for a [`super::SingleFlightCache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when an insert does not specify one
    pub default_ttl: Duration,
    /// Upper bound on stored entries; oldest entries are evicted beyond it
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Configuration with the given default TTL.
    #[must_use]
    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            ..Self::default()
        }
    }

    /// Override the entry cap.
    #[must_use]
    pub const fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}
