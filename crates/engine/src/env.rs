//! Evaluation environment: everything an expression can see besides the node it runs on.

use crate::error::Result;
use crate::namespace::NamespaceResolver;
use crate::pointer::{PointerRef, VariablePointer};
use crate::registry::PointerRegistry;
use crate::value::PathValue;
use indexmap::IndexMap;
use objpath_types::{Locale, QName, Value};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A variable scope. Implementations use interior mutability so scopes can be shared.
pub trait Variables: Send + Sync + fmt::Debug {
    fn is_declared(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> Option<Value>;

    fn declare(&self, name: &str, value: Value);

    fn undeclare(&self, name: &str);
}

/// The default variable scope: an ordered name table.
#[derive(Debug, Default)]
pub struct BasicVariables {
    vars: RwLock<IndexMap<String, Value>>,
}

impl BasicVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Variables for BasicVariables {
    fn is_declared(&self, name: &str) -> bool {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn declare(&self, name: &str, value: Value) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }

    fn undeclare(&self, name: &str) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name);
    }
}

/// A callable extension function.
pub trait Function: Send + Sync {
    fn invoke(&self, state: &EvalState, args: &[PathValue]) -> Result<PathValue>;
}

impl<F> Function for F
where
    F: Fn(&EvalState, &[PathValue]) -> Result<PathValue> + Send + Sync,
{
    fn invoke(&self, state: &EvalState, args: &[PathValue]) -> Result<PathValue> {
        self(state, args)
    }
}

/// Resolves extension functions by namespace prefix, local name and arity.
pub trait Functions: Send + Sync {
    fn function(&self, prefix: Option<&str>, name: &str, arity: usize) -> Option<Arc<dyn Function>>;
}

/// Supplies objects for missing intermediate nodes when a path is created.
pub trait ObjectFactory: Send + Sync {
    /// Returns `None` to fall back to the default object for the slot.
    fn create_object(&self, parent: &PointerRef, name: &str, index: Option<usize>) -> Option<Value>;
}

impl<F> ObjectFactory for F
where
    F: Fn(&PointerRef, &str, Option<usize>) -> Option<Value> + Send + Sync,
{
    fn create_object(&self, parent: &PointerRef, name: &str, index: Option<usize>) -> Option<Value> {
        self(parent, name, index)
    }
}

/// One context's settings, chained to the context it was derived from.
#[derive(Clone)]
pub struct Environment {
    /// Target of absolute paths.
    pub root: PointerRef,
    pub registry: Arc<PointerRegistry>,
    pub variables: Arc<dyn Variables>,
    pub functions: Option<Arc<dyn Functions>>,
    pub namespaces: Arc<NamespaceResolver>,
    pub locale: Locale,
    pub lenient: bool,
    pub factory: Option<Arc<dyn ObjectFactory>>,
    pub parent: Option<Arc<Environment>>,
}

impl Environment {
    pub fn new(root: PointerRef, registry: Arc<PointerRegistry>, variables: Arc<dyn Variables>) -> Self {
        let locale = root.state().locale().clone();
        Self {
            root,
            registry,
            variables,
            functions: None,
            namespaces: Arc::new(NamespaceResolver::default()),
            locale,
            lenient: false,
            factory: None,
            parent: None,
        }
    }

    fn chain(&self) -> impl Iterator<Item = &Environment> {
        std::iter::successors(Some(self), |env| env.parent.as_deref())
    }

    /// The nearest scope in the chain that declares `name`.
    pub fn variable_scope(&self, name: &str) -> Option<Arc<dyn Variables>> {
        self.chain()
            .find(|env| env.variables.is_declared(name))
            .map(|env| env.variables.clone())
    }

    pub fn variable_pointer(&self, name: &QName) -> Option<VariablePointer> {
        let scope = self.variable_scope(&name.to_string())?;
        Some(VariablePointer::new(
            name.clone(),
            scope,
            self.locale.clone(),
            self.registry.clone(),
        ))
    }

    /// The nearest extension function in the chain.
    pub fn function(&self, name: &QName, arity: usize) -> Option<Arc<dyn Function>> {
        self.chain().find_map(|env| {
            env.functions
                .as_ref()?
                .function(name.prefix(), name.name(), arity)
        })
    }

    /// The nearest object factory in the chain.
    pub fn factory(&self) -> Option<&dyn ObjectFactory> {
        self.chain().find_map(|env| env.factory.as_deref())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("root", &self.root)
            .field("locale", &self.locale)
            .field("lenient", &self.lenient)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// The node an expression is evaluated on, with its position in the current node list.
#[derive(Debug, Clone)]
pub struct EvalState {
    pub env: Arc<Environment>,
    pub node: PointerRef,
    /// 1-based.
    pub position: usize,
    pub size: usize,
}

impl EvalState {
    pub fn new(env: Arc<Environment>, node: PointerRef) -> Self {
        Self {
            env,
            node,
            position: 1,
            size: 1,
        }
    }

    pub fn at(&self, node: PointerRef, position: usize, size: usize) -> Self {
        Self {
            env: self.env.clone(),
            node,
            position,
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_scope_chain() {
        let registry = PointerRegistry::with_defaults();
        let root = registry.root(&Value::Null, &Locale::default()).unwrap();

        let outer = Arc::new(BasicVariables::new());
        outer.declare("a", Value::from(1));
        outer.declare("b", Value::from(2));
        let parent = Arc::new(Environment::new(root.clone(), registry.clone(), outer));

        let inner = Arc::new(BasicVariables::new());
        inner.declare("b", Value::from(20));
        let mut env = Environment::new(root, registry, inner);
        env.parent = Some(parent);

        assert_eq!(env.variable_scope("a").unwrap().get("a"), Some(Value::from(1)));
        assert_eq!(env.variable_scope("b").unwrap().get("b"), Some(Value::from(20)));
        assert!(env.variable_scope("c").is_none());
    }
}
