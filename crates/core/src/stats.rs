//! Counters describing the expression cache.
//!
//! The cache only ever writes these; nothing in the engine reads them back to
//! make decisions, so every update is a relaxed atomic operation.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct CacheStatistics {
    cache_size: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    limit_exceeded: AtomicU64,
    parse_time: AtomicU64,
    parse_count: AtomicU64,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries the cache held after its last insertion.
    pub fn cache_size(&self) -> usize {
        self.cache_size.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// How many insertions found the cache full and evicted an entry.
    pub fn limit_exceeded(&self) -> u64 {
        self.limit_exceeded.load(Ordering::Relaxed)
    }

    /// Total time spent parsing, in nanoseconds.
    pub fn parse_time(&self) -> u64 {
        self.parse_time.load(Ordering::Relaxed)
    }

    pub fn parse_count(&self) -> u64 {
        self.parse_count.load(Ordering::Relaxed)
    }

    /// Mean parse time, zero when nothing has been parsed yet.
    pub fn average_parse_time(&self) -> Duration {
        let count = self.parse_count();
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.parse_time() / count)
    }

    pub fn reset(&self) {
        self.cache_size.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.limit_exceeded.store(0, Ordering::Relaxed);
        self.parse_time.store(0, Ordering::Relaxed);
        self.parse_count.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_limit_exceeded(&self) {
        self.limit_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_parse(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.parse_time.fetch_add(nanos, Ordering::Relaxed);
        self.parse_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_cache_size(&self, size: usize) {
        self.cache_size.store(size, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_parse_time() {
        let stats = CacheStatistics::new();
        assert_eq!(stats.average_parse_time(), Duration::ZERO);

        stats.record_parse(Duration::from_nanos(300));
        stats.record_parse(Duration::from_nanos(100));
        assert_eq!(stats.parse_count(), 2);
        assert_eq!(stats.parse_time(), 400);
        assert_eq!(stats.average_parse_time(), Duration::from_nanos(200));
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let stats = CacheStatistics::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_limit_exceeded();
        stats.set_cache_size(9);
        stats.reset();
        assert_eq!(
            (stats.hits(), stats.misses(), stats.limit_exceeded(), stats.cache_size()),
            (0, 0, 0, 0)
        );
    }
}
