//! # objpath
//!
//! Path expressions over in-memory object graphs.
//!
//! An expression such as `/orders[2]/lines[@sku = 'A-1']/qty` is compiled once
//! (and cached by source text), then evaluated by walking pointers: handles to
//! one location in the graph that know their parent, their name and, inside a
//! collection, their index. The same pointers are used to write, create and
//! remove nodes.
//!
//! ```no_run
//! use objpath::{EngineConfig, PathEngine, Value};
//!
//! let engine = PathEngine::new(EngineConfig::default());
//! let data = Value::from(serde_json::json!({"orders": [{"id": 1}, {"id": 2}]}));
//! let ctx = engine.context(data)?;
//! assert_eq!(ctx.get_value_as::<f64>("/orders[2]/id")?, Some(2.0));
//! # Ok::<(), objpath::PathError>(())
//! ```
//!
//! The workspace is split the usual way:
//! - **types**: the graph value model (`Value`, beans, shared lists and maps)
//! - **compiler**: the expression parser and AST
//! - **engine**: pointers, the factory registry, axes and evaluation
//! - **core**: the expression cache, configuration and `QueryContext`

pub use objpath_compiler as compiler;
pub use objpath_core as core;
pub use objpath_engine as engine;
pub use objpath_types as types;

pub use objpath_compiler::{Expression, SyntaxError, parse_expression};
pub use objpath_core::{
    CacheConfig, CacheStatistics, Coerce, CompiledPath, EngineConfig, ExpressionCache,
    FunctionLibrary, PathEngine, QueryContext, ReclamationMode, Values,
};
pub use objpath_engine::{
    BasicVariables, ContextIter, EvalState, Function, Functions, NodePointer, ObjectFactory,
    PathError, PathValue, PointerExt, PointerFactory, PointerRef, PointerRegistry, PointerRequest,
    Result, Variables, WHOLE_COLLECTION,
};
pub use objpath_types::{Bean, BeanError, Cell, Foreign, List, Locale, Map, QName, Record, Value};
