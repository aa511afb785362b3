//! Engine and cache configuration.

use log::warn;
use objpath_types::Locale;
use std::str::FromStr;
use thiserror::Error;

pub const CACHE_ENABLED_VAR: &str = "OBJPATH_CACHE_ENABLED";
pub const CACHE_SIZE_VAR: &str = "OBJPATH_CACHE_SIZE";
pub const CACHE_SOFT_VAR: &str = "OBJPATH_CACHE_SOFT";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}")]
    InvalidValue { var: &'static str, value: String },
}

/// How the expression cache gives entries back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReclamationMode {
    /// Entries may be reclaimed under memory pressure and are recompiled on the next lookup.
    /// The capacity bound still applies.
    #[default]
    Soft,
    /// Entries stay until the capacity is reached; one arbitrary entry is then evicted per insertion.
    Bounded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// When disabled every lookup recompiles and nothing is stored.
    pub enabled: bool,
    /// The maximum number of compiled expressions kept.
    ///
    /// Defaults to `200000`.
    pub capacity: usize,
    pub mode: ReclamationMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 200_000,
            mode: ReclamationMode::default(),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_mode(mut self, mode: ReclamationMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Settings shared by every context an engine creates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    /// Default lenient flag of new contexts. Lenient contexts answer `None` where strict ones fail with not-found.
    pub lenient: bool,
    pub locale: Locale,
}

impl EngineConfig {
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Defaults overridden by the `OBJPATH_CACHE_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`EngineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let read = |var: &'static str| lookup(var).map(|value| (var, value));

        if let Some((_, value)) = read(CACHE_ENABLED_VAR) {
            config.cache.enabled = value.trim().eq_ignore_ascii_case("true");
        }
        if let Some((var, value)) = read(CACHE_SIZE_VAR) {
            match parse_var::<usize>(var, &value) {
                Ok(capacity) => config.cache.capacity = capacity,
                Err(e) => warn!("{}; keeping cache size {}", e, config.cache.capacity),
            }
        }
        if let Some((_, value)) = read(CACHE_SOFT_VAR) {
            config.cache.mode = if value.trim().eq_ignore_ascii_case("true") {
                ReclamationMode::Soft
            } else {
                ReclamationMode::Bounded
            };
        }
        config
    }
}

fn parse_var<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.capacity, 200_000);
        assert_eq!(config.cache.mode, ReclamationMode::Soft);
        assert!(!config.lenient);
        assert_eq!(config.locale.as_str(), "en");
    }

    #[test]
    fn test_from_lookup() {
        let config = EngineConfig::from_lookup(lookup(&[
            (CACHE_ENABLED_VAR, "TRUE"),
            (CACHE_SIZE_VAR, "42"),
            (CACHE_SOFT_VAR, "false"),
        ]));
        assert_eq!(
            config.cache,
            CacheConfig::default()
                .with_capacity(42)
                .with_mode(ReclamationMode::Bounded)
        );

        let config = EngineConfig::from_lookup(lookup(&[(CACHE_ENABLED_VAR, "no")]));
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_bad_size_keeps_default() {
        let config = EngineConfig::from_lookup(lookup(&[(CACHE_SIZE_VAR, "lots")]));
        assert_eq!(config.cache.capacity, 200_000);
        assert_eq!(
            parse_var::<usize>(CACHE_SIZE_VAR, "lots"),
            Err(ConfigError::InvalidValue {
                var: CACHE_SIZE_VAR,
                value: "lots".to_string()
            })
        );
    }
}
