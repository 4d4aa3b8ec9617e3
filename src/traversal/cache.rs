//! Compiled executor cache
//!
//! Keyed by [`PathSpecification`], with LRU eviction at capacity and a sliding
//! expiration: every hit pushes the entry's deadline out by the full TTL. Expired
//! entries are dropped lazily on lookup or by [`ExecutorCache::purge_expired`].

use super::plugins::PathExecutor;
use super::spec::PathSpecification;
use super::PathResult;
use crate::config::CacheConfig;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Executors built on a miss
    pub compilations: u64,
    /// Entries pushed out by capacity
    pub evictions: u64,
    /// Entries dropped after sitting idle past the TTL
    pub expirations: u64,
    /// Current number of entries
    pub size: usize,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct CacheEntry {
    executor: Arc<dyn PathExecutor>,
    last_access: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.last_access) > ttl
    }
}

pub struct ExecutorCache {
    entries: Mutex<LruCache<PathSpecification, CacheEntry>>,
    ttl: Duration,
    counters: Counters,
}

impl ExecutorCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            counters: Counters::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Cached executor for `spec`, refreshing its last access time
    pub fn get(&self, spec: &PathSpecification) -> Option<Arc<dyn PathExecutor>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired = match entries.get_mut(spec) {
            Some(entry) if !entry.is_expired(self.ttl, now) => {
                entry.last_access = now;
                Counters::bump(&self.counters.hits);
                return Some(Arc::clone(&entry.executor));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(spec);
            Counters::bump(&self.counters.expirations);
            debug!(%spec, "executor expired");
        }
        Counters::bump(&self.counters.misses);
        None
    }

    /// Cached executor for `spec`, compiling and inserting one on a miss.
    ///
    /// Compilation runs outside the cache lock. If another caller inserted the same
    /// specification meanwhile, its executor wins and the fresh one is dropped.
    pub fn get_or_compile<F>(&self, spec: &PathSpecification, compile: F) -> PathResult<Arc<dyn PathExecutor>>
    where
        F: FnOnce() -> PathResult<Arc<dyn PathExecutor>>,
    {
        if let Some(executor) = self.get(spec) {
            return Ok(executor);
        }

        let executor = compile()?;
        Counters::bump(&self.counters.compilations);
        debug!(%spec, "executor compiled");

        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get_mut(spec) {
            if !existing.is_expired(self.ttl, now) {
                existing.last_access = now;
                return Ok(Arc::clone(&existing.executor));
            }
        }
        let entry = CacheEntry {
            executor: Arc::clone(&executor),
            last_access: now,
        };
        if let Some((evicted, _)) = entries.push(spec.clone(), entry) {
            if &evicted != spec {
                Counters::bump(&self.counters.evictions);
                debug!(spec = %evicted, "executor evicted");
            }
        }
        Ok(executor)
    }

    /// Drop every entry idle past the TTL; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<PathSpecification> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl, now))
            .map(|(spec, _)| spec.clone())
            .collect();
        for spec in &expired {
            entries.pop(spec);
        }
        self.counters
            .expirations
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    /// Drop every executor compiled for `algorithm`
    pub fn invalidate_algorithm(&self, algorithm: &str) -> usize {
        let mut entries = self.entries.lock();
        let doomed: Vec<PathSpecification> = entries
            .iter()
            .filter(|(spec, _)| spec.algorithm == algorithm)
            .map(|(spec, _)| spec.clone())
            .collect();
        for spec in &doomed {
            entries.pop(spec);
        }
        doomed.len()
    }

    pub fn contains(&self, spec: &PathSpecification) -> bool {
        self.entries.lock().contains(spec)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            compilations: self.counters.compilations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

impl Default for ExecutorCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl std::fmt::Debug for ExecutorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorCache")
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}
