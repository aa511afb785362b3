use super::{NodePointer, PointerRef, PointerState, WHOLE_COLLECTION, debug_as_path, deref_cells};
use crate::env::{ObjectFactory, Variables};
use crate::error::{PathError, Result};
use crate::registry::PointerRegistry;
use objpath_types::{Locale, QName, Value};
use std::fmt::Write as _;
use std::sync::Arc;

/// A variable in the scope that declares it. Renders as `$name`.
#[derive(Clone)]
pub struct VariablePointer {
    state: PointerState,
    name: QName,
    scope: Arc<dyn Variables>,
}

impl VariablePointer {
    pub fn new(
        name: QName,
        scope: Arc<dyn Variables>,
        locale: Locale,
        registry: Arc<PointerRegistry>,
    ) -> Self {
        Self {
            state: PointerState::new(None, locale, registry),
            name,
            scope,
        }
    }

    fn key(&self) -> String {
        self.name.to_string()
    }

    fn current(&self) -> Value {
        self.scope.get(&self.key()).unwrap_or_default()
    }

    fn element_index(&self) -> Result<Option<usize>> {
        let index = self.state.index();
        if index == WHOLE_COLLECTION {
            return Ok(None);
        }
        self.state.element_index().map(Some).ok_or_else(|| {
            PathError::unsupported(
                "variable",
                format!("Index {} is out of bounds for {}", index + 1, self.as_path()),
            )
        })
    }
}

impl NodePointer for VariablePointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "variable"
    }

    fn name(&self) -> Option<QName> {
        Some(self.name.clone())
    }

    fn base_value(&self) -> Value {
        self.current()
    }

    fn immediate_node(&self) -> Value {
        let value = self.current();
        match self.element_index() {
            Ok(None) => value,
            Ok(Some(i)) => match deref_cells(value.clone()) {
                Value::List(list) => list.get(i).unwrap_or_default(),
                _ if i == 0 => value,
                _ => Value::Null,
            },
            Err(_) => Value::Null,
        }
    }

    fn is_container(&self) -> bool {
        true
    }

    fn is_collection(&self) -> bool {
        matches!(deref_cells(self.current()), Value::List(_))
    }

    fn length(&self) -> usize {
        match deref_cells(self.current()) {
            Value::List(list) => list.len(),
            _ => 1,
        }
    }

    fn is_actual(&self) -> bool {
        if !self.scope.is_declared(&self.key()) {
            return false;
        }
        let index = self.state.index();
        index == WHOLE_COLLECTION || (index >= 0 && (index as u64) < self.length() as u64)
    }

    fn immediate_value_pointer(&self, this: &PointerRef) -> Result<Option<PointerRef>> {
        self.state
            .registry()
            .create(
                Some(&self.name),
                &self.immediate_node(),
                self.state.locale(),
                Some(this),
            )
            .map(Some)
    }

    fn with_index(&self, index: i64) -> Option<PointerRef> {
        Some(Arc::new(Self {
            state: self.state.clone().with_index(index),
            ..self.clone()
        }))
    }

    fn write_path_segment(&self, buffer: &mut String) {
        buffer.clear();
        let _ = write!(buffer, "${}", self.name);
        if self.state.index() != WHOLE_COLLECTION && self.is_collection() {
            let _ = write!(buffer, "[{}]", self.state.index() + 1);
        }
    }

    fn set_value(&self, value: Value) -> Result<()> {
        match self.element_index()? {
            None => {
                self.scope.declare(&self.key(), value);
                Ok(())
            }
            Some(i) => match deref_cells(self.current()) {
                Value::List(list) => {
                    list.ensure_len(i + 1);
                    list.set(i, value);
                    Ok(())
                }
                _ if i == 0 => {
                    self.scope.declare(&self.key(), value);
                    Ok(())
                }
                _ => Err(PathError::unsupported(
                    "variable",
                    format!("Cannot set {}: the variable is not a collection", self.as_path()),
                )),
            },
        }
    }

    fn create_path(&self, this: &PointerRef, _factory: Option<&dyn ObjectFactory>) -> Result<PointerRef> {
        if !self.scope.is_declared(&self.key()) {
            return Err(PathError::UndefinedVariable(self.key()));
        }
        Ok(this.clone())
    }

    fn remove(&self) -> Result<()> {
        match self.element_index()? {
            None => self.scope.undeclare(&self.key()),
            Some(i) => {
                if let Value::List(list) = deref_cells(self.current()) {
                    list.remove(i);
                }
            }
        }
        Ok(())
    }
}

debug_as_path!(VariablePointer);
