pub mod fixtures;

use objpath::{EngineConfig, PathEngine, QueryContext, Value};
use std::sync::Arc;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Routes engine logs through the test harness. `RUST_LOG=debug` shows them.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fresh engine with default settings and its own cache.
pub fn engine() -> Arc<PathEngine> {
    init_logging();
    PathEngine::new(EngineConfig::default())
}

/// A strict context over a JSON document.
pub fn context(data: serde_json::Value) -> QueryContext {
    context_with(&engine(), data)
}

pub fn context_with(engine: &Arc<PathEngine>, data: serde_json::Value) -> QueryContext {
    engine
        .context(Value::from(data))
        .expect("JSON documents always have a pointer factory")
}

/// Paths of every node `xpath` selects, in the order they are produced.
pub fn paths(ctx: &QueryContext, xpath: &str) -> Vec<String> {
    ctx.iterate_pointers(xpath)
        .expect("path should compile")
        .map(|pointer| pointer.expect("path should evaluate").as_path())
        .collect()
}

/// Values of every node `xpath` selects, as JSON.
pub fn values(ctx: &QueryContext, xpath: &str) -> Vec<serde_json::Value> {
    ctx.iterate(xpath)
        .expect("path should compile")
        .map(|value| value.expect("path should evaluate").to_json())
        .collect()
}
