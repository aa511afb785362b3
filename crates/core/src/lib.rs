//! # objpath-core
//!
//! Query contexts over object graphs and the state they share:
//! - **engine**: `PathEngine`, owner of the pointer factories and the expression cache
//! - **context**: `QueryContext`, the read and write operations callers use
//! - **compiled**: `CompiledPath`, a cached expression bound to its source text
//! - **cache** / **soft** / **stats**: the concurrent expression cache and its counters
//! - **config**: engine and cache settings, including the environment overrides
//! - **convert**: conversion of results to Rust types
//! - **functions**: a table of extension functions

pub mod cache;
pub mod compiled;
pub mod config;
pub mod context;
pub mod convert;
pub mod engine;
pub mod functions;
pub mod soft;
pub mod stats;

pub use cache::ExpressionCache;
pub use compiled::{CompiledPath, Values};
pub use config::{CacheConfig, ConfigError, EngineConfig, ReclamationMode};
pub use context::QueryContext;
pub use convert::Coerce;
pub use engine::PathEngine;
pub use functions::FunctionLibrary;
pub use soft::SoftMap;
pub use stats::CacheStatistics;
