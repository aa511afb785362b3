//! The shared state behind every query context: pointer factories and the expression cache.

use crate::cache::ExpressionCache;
use crate::compiled::CompiledPath;
use crate::config::{EngineConfig, ReclamationMode};
use crate::context::QueryContext;
use crate::stats::CacheStatistics;
use log::info;
use objpath_engine::{PointerFactory, PointerRegistry, Result};
use objpath_types::Value;
use std::fmt;
use std::sync::Arc;

pub struct PathEngine {
    config: EngineConfig,
    registry: Arc<PointerRegistry>,
    cache: ExpressionCache,
}

impl PathEngine {
    pub fn new(config: EngineConfig) -> Arc<Self> {
        if config.cache.enabled {
            let mode = match config.cache.mode {
                ReclamationMode::Soft => "soft",
                ReclamationMode::Bounded => "bounded",
            };
            info!(
                "Path engine initialized with cache size: {} ({} entries)",
                config.cache.capacity, mode
            );
        } else {
            info!("Path engine initialized with disabled cache");
        }
        Arc::new(Self {
            registry: PointerRegistry::with_defaults(),
            cache: ExpressionCache::new(&config.cache),
            config,
        })
    }

    /// An engine configured from the `OBJPATH_CACHE_*` environment variables.
    pub fn from_env() -> Arc<Self> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PointerRegistry> {
        &self.registry
    }

    /// Adds a pointer factory. Contexts pick it up on their next lookup.
    pub fn register_factory(&self, factory: Arc<dyn PointerFactory>) {
        self.registry.register(factory);
    }

    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    pub fn statistics(&self) -> &CacheStatistics {
        self.cache.statistics()
    }

    pub fn compile(&self, xpath: &str) -> Result<CompiledPath> {
        let expr = self.cache.get_or_compile(xpath)?;
        Ok(CompiledPath::new(xpath, expr))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Empties the cache and zeroes its statistics.
    pub fn reset(&self) {
        self.cache.clear();
        self.cache.statistics().reset();
    }

    /// A context over `root` with the configured lenient flag and locale.
    pub fn context(self: &Arc<Self>, root: impl Into<Value>) -> Result<QueryContext> {
        QueryContext::new(self, root)
    }
}

impl fmt::Debug for PathEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("cached", &self.cache.len())
            .finish()
    }
}
