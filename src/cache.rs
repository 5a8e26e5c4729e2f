// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Time- and capacity-bounded key/value cache shared by the resolvers.
//!
//! Entries may carry an absolute expiry instant. Expiry is lazy: an expired
//! entry stays in the map until it is read or purged to make room.
//! When a capacity is configured, inserting a new key into a full cache evicts
//! the least recently used entry.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Time source used for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Thread-safe cache with optional TTL and optional capacity.
pub struct TimeBoundCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    default_ttl: Option<Duration>,
    max_size: Option<usize>,
    clock: Arc<dyn Clock>,
}

impl<K, V> TimeBoundCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Cache that never expires or evicts anything.
    pub fn unbounded() -> Self {
        Self::with_config(None, None)
    }

    /// Cache whose entries expire after `ttl` and hold at most `max_size` keys.
    pub fn with_default_ttl(ttl: Duration, max_size: usize) -> Self {
        Self::with_config(Some(ttl), Some(max_size))
    }

    /// Create a cache with custom TTL and max size.
    pub fn with_config(default_ttl: Option<Duration>, max_size: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            max_size,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get a live value, refreshing its recency.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.write().ok()?;

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired(now) {
                entries.remove(key);
                return None;
            }
            entry.last_accessed = now;
            return Some(entry.value.clone());
        }

        None
    }

    /// Insert with an explicit TTL. `None` keeps the entry until evicted.
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        let now = self.clock.now();
        let mut entries = match self.entries.write() {
            Ok(e) => e,
            Err(_) => return,
        };

        if let Some(max_size) = self.max_size {
            if !entries.contains_key(&key) && entries.len() >= max_size {
                Self::evict(&mut entries, max_size, now);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: ttl.map(|ttl| now + ttl),
                last_accessed: now,
            },
        );
    }

    /// Insert using the cache's default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.put(key, value, self.default_ttl);
    }

    /// Purge expired entries, then the least recently used one if still full.
    fn evict(entries: &mut HashMap<K, CacheEntry<V>>, max_size: usize, now: Instant) {
        entries.retain(|_, entry| !entry.is_expired(now));

        if entries.len() >= max_size {
            if let Some(oldest_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest_key);
            }
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
