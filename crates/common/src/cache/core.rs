//! Single-flight TTL cache built on per-key maps

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::debug;

use super::config::CacheConfig;
use super::stats::{CacheStats, CacheStatsSnapshot};
use crate::time::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type FlightCell<V, E> = Arc<OnceCell<Result<V, E>>>;

/// Concurrent TTL cache with single-flight computation.
///
/// Storage and in-flight computations live in separate per-key maps, so
/// contention is scoped to the key being computed. Expired entries are
/// dropped lazily on read; [`SingleFlightCache::sweep_expired`] reclaims the
/// rest.
///
/// A computation error is delivered to every caller coalesced onto that
/// flight and is never stored: the next lookup starts a fresh flight. If the
/// task driving the computation is cancelled mid-flight, one of the waiting
/// callers takes over the computation.
pub struct SingleFlightCache<K, V, E, C = SystemClock> {
    entries: DashMap<K, CacheEntry<V>>,
    inflight: DashMap<K, FlightCell<V, E>>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
    clock: C,
}

impl<K, V, E> SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    /// Cache backed by the system clock.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, E, C> SingleFlightCache<K, V, E, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
    C: Clock,
{
    /// Cache reading time through the given clock. Tests pass a
    /// [`crate::time::MockClock`] to drive expiry deterministically.
    #[must_use]
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            config,
            stats: Arc::new(CacheStats::default()),
            clock,
        }
    }

    /// Look up a live value. Expired entries are removed, counted, and
    /// reported as misses.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                self.stats.record_hit();
                return Some(entry.value.clone());
            }
        }
        // Second lookup via remove_if keeps expiry racing with concurrent
        // inserts correct: only a still-expired entry is dropped.
        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            self.stats.record_expiration();
        }
        self.stats.record_miss();
        None
    }

    /// Insert with the configured default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.config.default_ttl);
    }

    /// Insert with an explicit TTL.
    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let now = self.clock.now();
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_one();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at: now + ttl,
            },
        );
        self.stats.record_insert();
    }

    /// Return the cached value for `key`, or run `compute` to produce it.
    ///
    /// Concurrent misses for the same key share one `compute` invocation;
    /// misses for different keys proceed independently. The result is cached
    /// with `ttl` only on success.
    pub async fn get_or_compute<F, Fut>(&self, key: K, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let cell: FlightCell<V, E> = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_init(|| async { compute().await })
            .await
            .clone();

        // First completer retires the flight; ptr_eq guards against removing
        // a newer flight for the same key.
        let retired = self
            .inflight
            .remove_if(&key, |_, current| Arc::ptr_eq(current, &cell))
            .is_some();
        if retired {
            match &result {
                Ok(value) => self.insert_with_ttl(key, value.clone(), ttl),
                Err(_) => debug!("single-flight computation failed, nothing cached"),
            }
        }

        result
    }

    /// Drop the entry for `key`. Returns whether an entry existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every stored entry. In-flight computations are unaffected.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove all expired entries, returning how many were reclaimed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        for _ in 0..removed {
            self.stats.record_expiration();
        }
        removed
    }

    /// Number of stored entries, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counter snapshot for diagnostics.
    #[must_use]
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Evict the oldest entry to make room for a new key.
    fn evict_one(&self) {
        if self.sweep_expired() > 0 {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            if self.entries.remove(&key).is_some() {
                self.stats.record_eviction();
            }
        }
    }
}
