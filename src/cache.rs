//! Short-TTL cache of analyzer outcomes
//!
//! Keyed by (token, analyzer). A hit short-circuits a network call; a miss
//! never blocks. Expiry is lazy on read, which is enough for correctness;
//! the capacity bound keeps memory in check without a background sweep.

use dashmap::DashMap;
use rand::seq::IteratorRandom;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::{AnalyzerId, AnalyzerOutcome};

/// Entry with TTL
#[derive(Clone)]
struct CachedOutcome {
    outcome: AnalyzerOutcome,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedOutcome {
    fn new(outcome: AnalyzerOutcome, ttl: Duration) -> Self {
        Self {
            outcome,
            cached_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Cache statistics for monitoring
#[derive(Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Concurrent result cache shared across all pipeline runs
pub struct ResultCache {
    entries: DashMap<(String, AnalyzerId), CachedOutcome>,
    max_entries: usize,
    stats: Arc<CacheStats>,
}

impl ResultCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(max_entries.min(1024)),
            max_entries,
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Get a non-expired outcome for (token, analyzer). Expired entries are
    /// removed and reported as misses.
    pub fn get(&self, address: &str, analyzer: AnalyzerId) -> Option<AnalyzerOutcome> {
        let key = (address.to_string(), analyzer);
        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.outcome.clone());
            }
            drop(entry);
            self.entries.remove(&key);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store an outcome with its analyzer's TTL
    pub fn put(&self, address: &str, analyzer: AnalyzerId, outcome: AnalyzerOutcome, ttl: Duration) {
        // Evict ~10% of entries at capacity (random eviction; entries are
        // short-lived so precision is not worth the bookkeeping)
        if self.entries.len() >= self.max_entries {
            let to_remove = (self.max_entries / 10).max(1);
            let mut rng = rand::thread_rng();
            let keys: Vec<_> = self
                .entries
                .iter()
                .map(|r| r.key().clone())
                .choose_multiple(&mut rng, to_remove);
            for key in keys {
                self.entries.remove(&key);
            }
        }

        self.entries.insert(
            (address.to_string(), analyzer),
            CachedOutcome::new(outcome, ttl),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
