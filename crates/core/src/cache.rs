//! The shared cache of compiled expressions, keyed by source text.
//!
//! Concurrent misses on one key may each compile and insert; compiled
//! expressions are immutable, so the store ends up with one equivalent entry.

use crate::config::{CacheConfig, ReclamationMode};
use crate::soft::{SoftMap, insert_bounded};
use crate::stats::CacheStatistics;
use chrono::Utc;
use dashmap::DashMap;
use log::{debug, info, warn};
use objpath_compiler::{Expression, parse_expression};
use objpath_engine::Result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub const EXPORT_FILE_PREFIX: &str = "objpath-cache-keys.";

enum Store {
    Disabled,
    Soft(SoftMap<String, Expression>),
    Bounded {
        entries: DashMap<String, Arc<Expression>>,
        writes: Mutex<()>,
    },
}

pub struct ExpressionCache {
    store: Store,
    capacity: usize,
    stats: CacheStatistics,
}

impl ExpressionCache {
    pub fn new(config: &CacheConfig) -> Self {
        let store = match (config.enabled, config.mode) {
            (false, _) => Store::Disabled,
            (true, ReclamationMode::Soft) => Store::Soft(SoftMap::new(config.capacity)),
            (true, ReclamationMode::Bounded) => Store::Bounded {
                entries: DashMap::new(),
                writes: Mutex::new(()),
            },
        };
        Self {
            store,
            capacity: config.capacity,
            stats: CacheStatistics::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.store, Store::Disabled)
    }

    pub fn statistics(&self) -> &CacheStatistics {
        &self.stats
    }

    /// The compiled form of `source`, parsing it on a miss.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Expression>> {
        if let Some(expr) = self.lookup(source) {
            self.stats.record_hit();
            return Ok(expr);
        }
        if self.is_enabled() {
            self.stats.record_miss();
        }

        let start = Instant::now();
        let expr = Arc::new(parse_expression(source)?);
        let elapsed = start.elapsed();
        self.stats.record_parse(elapsed);
        debug!("Compiled '{}' in {:?}", source, elapsed);

        self.store(source, expr.clone());
        Ok(expr)
    }

    fn lookup(&self, source: &str) -> Option<Arc<Expression>> {
        match &self.store {
            Store::Disabled => None,
            Store::Soft(map) => map.get(source),
            Store::Bounded { entries: map, .. } => map.get(source).map(|entry| entry.value().clone()),
        }
    }

    fn store(&self, source: &str, expr: Arc<Expression>) {
        let evicted = match &self.store {
            Store::Disabled => return,
            Store::Soft(map) => map.insert(source.to_string(), expr),
            Store::Bounded { entries, writes } => {
                insert_bounded(entries, writes, self.capacity, source.to_string(), expr)
            }
        };
        if evicted {
            self.stats.record_limit_exceeded();
            warn!(
                "Expression cache limit of {} entries reached. Consider increasing {}.",
                self.capacity,
                crate::config::CACHE_SIZE_VAR
            );
        }
        self.stats.set_cache_size(self.len());
    }

    pub fn len(&self) -> usize {
        match &self.store {
            Store::Disabled => 0,
            Store::Soft(map) => map.len(),
            Store::Bounded { entries: map, .. } => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, source: &str) -> bool {
        self.lookup(source).is_some()
    }

    /// Source texts currently cached, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        match &self.store {
            Store::Disabled => Vec::new(),
            Store::Soft(map) => map.keys(),
            Store::Bounded { entries: map, .. } => map.iter().map(|entry| entry.key().clone()).collect(),
        }
    }

    pub fn clear(&self) {
        match &self.store {
            Store::Disabled => {}
            Store::Soft(map) => map.clear(),
            Store::Bounded { entries: map, .. } => map.clear(),
        }
        self.stats.set_cache_size(0);
    }

    /// Releases soft entries that are not in use elsewhere. Bounded caches keep everything.
    pub fn reclaim(&self) -> usize {
        let dropped = match &self.store {
            Store::Soft(map) => map.reclaim(),
            _ => 0,
        };
        if dropped > 0 {
            debug!("Reclaimed {} cached expressions", dropped);
            self.stats.set_cache_size(self.len());
        }
        dropped
    }

    /// Writes every cached source text, one per line, followed by `Size: N`, into a
    /// timestamped file in `dir`. Returns the file written.
    pub fn export_keys(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        let file_name = format!("{}{}", EXPORT_FILE_PREFIX, Utc::now().timestamp_millis());
        let path = dir.as_ref().join(file_name);
        let keys = self.keys();

        let mut out = BufWriter::new(File::create(&path)?);
        for key in &keys {
            writeln!(out, "{}", key)?;
        }
        writeln!(out, "Size: {}", keys.len())?;
        out.flush()?;

        info!("Exported cache keys to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ReclamationMode::Soft)]
    #[case(ReclamationMode::Bounded)]
    fn test_hit_after_miss(#[case] mode: ReclamationMode) {
        let cache = ExpressionCache::new(&CacheConfig::default().with_mode(mode));
        let first = cache.get_or_compile("/a/b").unwrap();
        let second = cache.get_or_compile("/a/b").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.statistics();
        assert_eq!((stats.hits(), stats.misses(), stats.parse_count()), (1, 1, 1));
        assert_eq!(stats.cache_size(), 1);
    }

    #[test]
    fn test_disabled_always_parses() {
        let cache = ExpressionCache::new(&CacheConfig::disabled());
        cache.get_or_compile("a").unwrap();
        cache.get_or_compile("a").unwrap();
        assert!(cache.is_empty());
        let stats = cache.statistics();
        assert_eq!((stats.hits(), stats.misses(), stats.parse_count()), (0, 0, 2));
    }

    #[rstest]
    #[case(ReclamationMode::Soft)]
    #[case(ReclamationMode::Bounded)]
    fn test_capacity_is_honoured(#[case] mode: ReclamationMode) {
        let config = CacheConfig::default().with_capacity(2).with_mode(mode);
        let cache = ExpressionCache::new(&config);
        for source in ["a", "b", "c"] {
            cache.get_or_compile(source).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("c"));
        assert_eq!(cache.statistics().limit_exceeded(), 1);
    }

    #[test]
    fn test_syntax_errors_are_not_cached() {
        let cache = ExpressionCache::new(&CacheConfig::default());
        assert!(cache.get_or_compile("/a[").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reclaimed_entry_is_a_miss() {
        let cache = ExpressionCache::new(&CacheConfig::default());
        cache.get_or_compile("/a").unwrap();
        assert_eq!(cache.reclaim(), 1);
        assert!(!cache.contains("/a"));

        cache.get_or_compile("/a").unwrap();
        assert_eq!(cache.statistics().misses(), 2);
        assert_eq!(cache.statistics().parse_count(), 2);
    }
}
