//! The caller-facing query context.
//!
//! A context pairs a node of an object graph with the settings expressions are
//! evaluated under. Contexts derived with [`QueryContext::relative_context`]
//! keep the absolute root of their parent and look up variables, functions,
//! namespaces and the object factory through the parent chain.

use crate::compiled::{CompiledPath, Values};
use crate::convert::Coerce;
use crate::engine::PathEngine;
use log::debug;
use objpath_engine::{
    BasicVariables, ContextIter, Environment, EvalState, Functions, NamespaceResolver, ObjectFactory,
    PathError, PointerExt, PointerRef, Result, Variables,
};
use objpath_types::{Locale, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct QueryContext {
    engine: Arc<PathEngine>,
    env: Arc<Environment>,
    /// Target of relative paths.
    context: PointerRef,
}

impl QueryContext {
    pub fn new(engine: &Arc<PathEngine>, root: impl Into<Value>) -> Result<Self> {
        let config = engine.config();
        let root = engine.registry().root(&root.into(), &config.locale)?;

        let mut env = Environment::new(
            root.clone(),
            engine.registry().clone(),
            Arc::new(BasicVariables::new()),
        );
        env.lenient = config.lenient;
        env.locale = config.locale.clone();
        let mut namespaces = NamespaceResolver::new(None);
        namespaces.set_namespace_context_pointer(Some(root.clone()));
        env.namespaces = Arc::new(namespaces);

        Ok(Self {
            engine: engine.clone(),
            env: Arc::new(env),
            context: root,
        })
    }

    pub fn engine(&self) -> &Arc<PathEngine> {
        &self.engine
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn context_pointer(&self) -> &PointerRef {
        &self.context
    }

    /// Target of absolute paths.
    pub fn root_pointer(&self) -> &PointerRef {
        &self.env.root
    }

    pub fn context_value(&self) -> Result<Value> {
        self.context.value()
    }

    pub(crate) fn eval_state(&self) -> EvalState {
        EvalState::new(self.env.clone(), self.context.clone())
    }

    pub(crate) fn new_pointer(&self, value: &Value) -> Result<PointerRef> {
        self.engine.registry().root(value, &self.env.locale)
    }

    fn env_mut(&mut self) -> &mut Environment {
        Arc::make_mut(&mut self.env)
    }

    // Settings

    pub fn is_lenient(&self) -> bool {
        self.env.lenient
    }

    pub fn set_lenient(&mut self, lenient: bool) {
        self.env_mut().lenient = lenient;
    }

    pub fn locale(&self) -> &Locale {
        &self.env.locale
    }

    /// Changes the locale of pointers created from now on. A top-level context
    /// also rebuilds its root pointer under the new locale.
    pub fn set_locale(&mut self, locale: impl Into<Locale>) -> Result<()> {
        let locale = locale.into();
        if self.env.parent.is_none() {
            let root = self
                .engine
                .registry()
                .root(&self.env.root.base_value(), &locale)?;
            self.env_mut().root = root.clone();
            self.context = root;
        }
        self.env_mut().locale = locale;
        Ok(())
    }

    /// The factory consulted for missing intermediate objects by the create operations.
    pub fn set_factory(&mut self, factory: Arc<dyn ObjectFactory>) {
        self.env_mut().factory = Some(factory);
    }

    pub fn set_functions(&mut self, functions: Arc<dyn Functions>) {
        self.env_mut().functions = Some(functions);
    }

    pub fn functions(&self) -> Option<&Arc<dyn Functions>> {
        self.env.functions.as_ref()
    }

    // Variables

    /// This context's own variable scope. Lookups fall back to the parent chain.
    pub fn variables(&self) -> &Arc<dyn Variables> {
        &self.env.variables
    }

    pub fn set_variables(&mut self, variables: Arc<dyn Variables>) {
        self.env_mut().variables = variables;
    }

    pub fn declare_variable(&self, name: &str, value: impl Into<Value>) {
        self.env.variables.declare(name, value.into());
    }

    pub fn undeclare_variable(&self, name: &str) {
        self.env.variables.undeclare(name);
    }

    // Namespaces

    /// Binds `prefix` in this context. Contexts already derived from this one keep the bindings they saw.
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) {
        Arc::make_mut(&mut self.env_mut().namespaces).register(prefix, uri);
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<String> {
        self.env.namespaces.namespace_uri(prefix)
    }

    pub fn prefix(&self, uri: &str) -> Option<String> {
        self.env.namespaces.prefix(uri)
    }

    pub fn set_namespace_context_pointer(&mut self, pointer: Option<PointerRef>) {
        Arc::make_mut(&mut self.env_mut().namespaces).set_namespace_context_pointer(pointer);
    }

    pub fn namespace_context_pointer(&self) -> Option<PointerRef> {
        self.env.namespaces.namespace_context_pointer().cloned()
    }

    // Queries

    /// Compiles through the engine's expression cache.
    pub fn compile(&self, xpath: &str) -> Result<CompiledPath> {
        self.engine.compile(xpath)
    }

    pub fn get_value(&self, xpath: &str) -> Result<Option<Value>> {
        self.compile(xpath)?.get_value(self)
    }

    pub fn get_value_as<T: Coerce>(&self, xpath: &str) -> Result<Option<T>> {
        self.compile(xpath)?.get_value_as(self)
    }

    pub fn get_pointer(&self, xpath: &str) -> Result<PointerRef> {
        self.compile(xpath)?.get_pointer(self)
    }

    pub fn iterate(&self, xpath: &str) -> Result<Values> {
        self.compile(xpath)?.iterate(self)
    }

    pub fn iterate_pointers(&self, xpath: &str) -> Result<ContextIter> {
        self.compile(xpath)?.iterate_pointers(self)
    }

    pub fn set_value(&self, xpath: &str, value: impl Into<Value>) -> Result<()> {
        self.compile(xpath)?.set_value(self, value)
    }

    pub fn create_path(&self, xpath: &str) -> Result<PointerRef> {
        self.compile(xpath)?.create_path(self)
    }

    pub fn create_path_and_set_value(&self, xpath: &str, value: impl Into<Value>) -> Result<PointerRef> {
        self.compile(xpath)?.create_path_and_set_value(self, value)
    }

    pub fn remove_path(&self, xpath: &str) -> Result<()> {
        self.compile(xpath)?.remove_path(self)
    }

    pub fn remove_all(&self, xpath: &str) -> Result<()> {
        self.compile(xpath)?.remove_all(self)
    }

    /// A context whose relative paths start at `pointer`.
    pub fn relative_context(&self, pointer: &PointerRef) -> Result<QueryContext> {
        if pointer.value()?.is_null() {
            return Err(PathError::NonExistentContext(pointer.as_path()));
        }
        let registry = self.engine.registry();
        let root = registry.root(&pointer.root_node(), &self.env.locale)?;

        let mut namespaces = NamespaceResolver::new(Some(self.env.namespaces.clone()));
        namespaces.set_namespace_context_pointer(Some(pointer.clone()));

        let env = Environment {
            root,
            registry: registry.clone(),
            variables: Arc::new(BasicVariables::new()),
            functions: None,
            namespaces: Arc::new(namespaces),
            locale: self.env.locale.clone(),
            lenient: self.env.lenient,
            factory: None,
            parent: Some(self.env.clone()),
        };
        debug!("Created relative context at {}", pointer.as_path());
        Ok(QueryContext {
            engine: self.engine.clone(),
            env: Arc::new(env),
            context: pointer.clone(),
        })
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("context", &self.context)
            .field("env", &self.env)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use serde_json::json;

    fn context(data: serde_json::Value) -> QueryContext {
        let engine = PathEngine::new(EngineConfig::default());
        QueryContext::new(&engine, Value::from(data)).unwrap()
    }

    #[test]
    fn test_get_value_through_property_list() {
        let ctx = context(json!({"books": [{"title": "A"}, {"title": "B"}]}));
        assert_eq!(ctx.get_value("/books[2]/title").unwrap(), Some(Value::from("B")));
        assert_eq!(ctx.get_value_as::<f64>("count(books)").unwrap(), Some(2.0));
    }

    #[test]
    fn test_strict_and_lenient_missing_value() {
        let mut ctx = context(json!({"a": {}}));
        assert!(ctx.get_value("/a/missing").unwrap_err().is_not_found());
        assert!(ctx.get_value("/a/*[3]").unwrap_err().is_not_found());

        ctx.set_lenient(true);
        assert_eq!(ctx.get_value("/a/missing").unwrap(), None);
        assert_eq!(ctx.get_value("/a/*[3]").unwrap(), None);
    }

    #[test]
    fn test_null_property_reads_as_none() {
        let ctx = context(json!({"a": null}));
        assert_eq!(ctx.get_value("/a").unwrap(), None);
    }

    #[test]
    fn test_create_path_rejects_complex_paths() {
        let ctx = context(json!({"a": {}}));
        for xpath in ["/a//b", "/a/b[position() = 1]", "/a/*", "count(/a)", "/a/b | /a/c"] {
            let err = ctx.create_path(xpath).unwrap_err();
            assert!(
                matches!(err, PathError::InvalidMutationPath { ref path } if path == xpath),
                "{xpath}: {err:?}"
            );
        }
    }

    #[test]
    fn test_create_path_and_set_value() {
        let ctx = context(json!({}));
        let pointer = ctx.create_path_and_set_value("/a/b/c", 7.0).unwrap();
        assert_eq!(pointer.as_path(), "/a/b/c");
        assert_eq!(ctx.get_value("/a/b/c").unwrap(), Some(Value::from(7.0)));
    }

    #[test]
    fn test_variables_are_inherited_by_relative_contexts() {
        let ctx = context(json!({"items": [{"n": 1}, {"n": 2}]}));
        ctx.declare_variable("limit", 1.0);

        let second = ctx.get_pointer("/items[2]").unwrap();
        let child = ctx.relative_context(&second).unwrap();
        assert_eq!(child.get_value("n").unwrap(), Some(Value::from(2.0)));
        assert_eq!(child.get_value("/items[1]/n").unwrap(), Some(Value::from(1.0)));
        assert_eq!(child.get_value_as::<bool>("n > $limit").unwrap(), Some(true));

        child.declare_variable("limit", 5.0);
        assert_eq!(child.get_value_as::<bool>("n > $limit").unwrap(), Some(false));
        assert_eq!(ctx.get_value_as::<f64>("$limit").unwrap(), Some(1.0));
    }

    #[test]
    fn test_relative_context_requires_a_node() {
        let mut ctx = context(json!({"a": null}));
        ctx.set_lenient(true);
        let pointer = ctx.get_pointer("/a").unwrap();
        let err = ctx.relative_context(&pointer).unwrap_err();
        assert_eq!(err, PathError::NonExistentContext("/a".to_string()));
    }

    #[test]
    fn test_namespace_bindings_are_copied_on_write() {
        let mut ctx = context(json!({"a": 1}));
        ctx.register_namespace("x", "urn:x");
        let child = ctx.relative_context(&ctx.get_pointer("/a").unwrap()).unwrap();

        ctx.register_namespace("y", "urn:y");
        assert_eq!(child.namespace_uri("x").as_deref(), Some("urn:x"));
        assert_eq!(child.namespace_uri("y"), None);
        assert_eq!(ctx.prefix("urn:y").as_deref(), Some("y"));
    }

    #[test]
    fn test_set_locale_rebuilds_root() {
        let mut ctx = context(json!({"a": 1}));
        ctx.set_locale("de-CH").unwrap();
        assert_eq!(ctx.root_pointer().state().locale().as_str(), "de-CH");
        assert_eq!(ctx.get_value_as::<bool>("lang('de')").unwrap(), Some(true));
    }
}
