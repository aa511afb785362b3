//! Pointer-based evaluation of compiled paths over object graphs.

pub mod axes;
pub mod context;
pub mod env;
pub mod error;
pub mod eval;
pub mod functions;
pub mod namespace;
pub mod operators;
pub mod pointer;
pub mod registry;
pub mod value;

pub use context::{ContextIter, EvalContext};
pub use env::{BasicVariables, Environment, EvalState, Function, Functions, ObjectFactory, Variables};
pub use error::{PathError, Result};
pub use eval::{Computed, Single};
pub use namespace::NamespaceResolver;
pub use pointer::{NodePointer, PointerExt, PointerRef, PointerState, WHOLE_COLLECTION};
pub use registry::{PointerFactory, PointerRegistry, PointerRequest};
pub use value::PathValue;
