//! A compiled expression bound to its source text.
//!
//! Every read and write operation of [`QueryContext`] is implemented here; the
//! context methods compile through the engine's cache and delegate.

use crate::context::QueryContext;
use crate::convert::Coerce;
use log::debug;
use objpath_compiler::Expression;
use objpath_engine::context::sort_unique;
use objpath_engine::eval::{self, Single};
use objpath_engine::{ContextIter, PathError, PointerExt, PointerRef, Result};
use objpath_types::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct CompiledPath {
    source: Arc<str>,
    expr: Arc<Expression>,
}

impl CompiledPath {
    pub(crate) fn new(source: &str, expr: Arc<Expression>) -> Self {
        Self {
            source: source.into(),
            expr,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    pub fn is_location_path(&self) -> bool {
        self.expr.is_location_path()
    }

    /// True if this is the same compiled expression, not merely an equal one.
    pub fn ptr_eq(&self, other: &CompiledPath) -> bool {
        Arc::ptr_eq(&self.expr, &other.expr)
    }

    fn not_found(&self) -> PathError {
        PathError::NotFound {
            path: self.source.to_string(),
        }
    }

    /// The value the expression denotes. `None` stands for null and, in lenient contexts, for no match.
    pub fn get_value(&self, ctx: &QueryContext) -> Result<Option<Value>> {
        let state = ctx.eval_state();
        let value = match eval::compute_value(&self.expr, &state)? {
            Single::Value(value) => value.into_value()?,
            Single::Pointer(pointer) => {
                let target = pointer.value_pointer()?;
                if !ctx.is_lenient() && !(pointer.is_actual() && target.is_actual()) {
                    return Err(self.not_found());
                }
                target.immediate_node()
            }
            Single::Empty if ctx.is_lenient() => return Ok(None),
            Single::Empty => return Err(self.not_found()),
        };
        Ok((!value.is_null()).then_some(value))
    }

    pub fn get_value_as<T: Coerce>(&self, ctx: &QueryContext) -> Result<Option<T>> {
        self.get_value(ctx)?.map(T::coerce).transpose()
    }

    /// The first node the expression selects. Non-node results are wrapped in a fresh pointer.
    pub fn get_pointer(&self, ctx: &QueryContext) -> Result<PointerRef> {
        let state = ctx.eval_state();
        match eval::compute_value(&self.expr, &state)? {
            Single::Pointer(pointer) => {
                if !ctx.is_lenient() && !pointer.is_actual() {
                    return Err(self.not_found());
                }
                Ok(pointer)
            }
            Single::Empty if ctx.is_lenient() => ctx.new_pointer(&Value::Null),
            Single::Empty => Err(self.not_found()),
            Single::Value(value) => ctx.new_pointer(&value.into_value()?),
        }
    }

    /// Values of every selected node, computed as the iterator advances.
    pub fn iterate(&self, ctx: &QueryContext) -> Result<Values> {
        Ok(Values(self.iterate_pointers(ctx)?))
    }

    pub fn iterate_pointers(&self, ctx: &QueryContext) -> Result<ContextIter> {
        let state = ctx.eval_state();
        let context = eval::compute(&self.expr, &state)?.into_context(&state)?;
        Ok(ContextIter(context))
    }

    pub fn set_value(&self, ctx: &QueryContext, value: impl Into<Value>) -> Result<()> {
        let state = ctx.eval_state();
        match eval::compute_value(&self.expr, &state)? {
            Single::Pointer(pointer) => pointer.set_value(value.into()),
            Single::Empty => Err(self.not_found()),
            Single::Value(_) => Err(PathError::UnsupportedMutation {
                kind: "value",
                message: format!("Cannot set value for xpath: {}", self.source),
            }),
        }
    }

    /// Only plain child and attribute paths, or a bare variable, can be created.
    fn check_creatable(&self) -> Result<()> {
        match &*self.expr {
            Expression::LocationPath(path) if path.is_simple_path() => Ok(()),
            Expression::Variable(_) => Ok(()),
            _ => Err(PathError::InvalidMutationPath {
                path: self.source.to_string(),
            }),
        }
    }

    fn creation_target(&self, ctx: &QueryContext) -> Result<PointerRef> {
        self.check_creatable()?;
        let state = ctx.eval_state();
        match eval::compute_value(&self.expr, &state)? {
            Single::Pointer(pointer) => Ok(pointer),
            _ => Err(self.not_found()),
        }
    }

    /// Makes the node exist, creating missing intermediate nodes on the way.
    pub fn create_path(&self, ctx: &QueryContext) -> Result<PointerRef> {
        let target = self.creation_target(ctx)?;
        target.create_path(&target, ctx.environment().factory())
    }

    pub fn create_path_and_set_value(
        &self,
        ctx: &QueryContext,
        value: impl Into<Value>,
    ) -> Result<PointerRef> {
        let target = self.creation_target(ctx)?;
        target.create_path_and_set(&target, ctx.environment().factory(), value.into())
    }

    pub fn remove_path(&self, ctx: &QueryContext) -> Result<()> {
        self.get_pointer(ctx)?.remove()
    }

    /// Removes every selected node, last in document order first.
    ///
    /// Only the first pointer is removed directly. Removing a collection element
    /// shifts the indices of its followers, so the others are resolved again
    /// from their paths.
    pub fn remove_all(&self, ctx: &QueryContext) -> Result<()> {
        let pointers = self.iterate_pointers(ctx)?.collect::<Result<Vec<_>>>()?;
        let mut pointers = sort_unique(pointers)?;
        pointers.reverse();
        debug!("Removing {} nodes selected by '{}'", pointers.len(), self.source);

        let mut pointers = pointers.into_iter();
        if let Some(first) = pointers.next() {
            first.remove()?;
        }
        for pointer in pointers {
            ctx.remove_path(&pointer.as_path())?;
        }
        Ok(())
    }
}

impl fmt::Debug for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledPath").field(&self.source).finish()
    }
}

impl fmt::Display for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Iterator over the values of a node sequence.
pub struct Values(ContextIter);

impl Iterator for Values {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|pointer| pointer?.value())
    }
}
