use super::{NodePointer, PointerExt, PointerRef, PointerState, WHOLE_COLLECTION, debug_as_path};
use crate::env::ObjectFactory;
use crate::error::{PathError, Result};
use objpath_types::{List, Map, QName, Value};
use std::fmt::Write as _;
use std::sync::Arc;

/// A list reached outside a named slot: the root object, a function result, or a nested list.
#[derive(Clone)]
pub struct CollectionPointer {
    state: PointerState,
    name: Option<QName>,
    list: List,
}

impl CollectionPointer {
    pub fn new(state: PointerState, name: Option<QName>, list: List) -> Self {
        Self { state, name, list }
    }

    fn element(&self, index: i64) -> Self {
        Self {
            state: self.state.clone().with_index(index),
            ..self.clone()
        }
    }

    fn out_of_bounds(&self) -> PathError {
        PathError::unsupported(
            "collection",
            format!("Index {} is out of bounds for {}", self.state.index() + 1, self.as_path()),
        )
    }
}

impl NodePointer for CollectionPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "collection"
    }

    fn name(&self) -> Option<QName> {
        self.name.clone()
    }

    fn base_value(&self) -> Value {
        Value::List(self.list.clone())
    }

    fn immediate_node(&self) -> Value {
        if self.state.index() == WHOLE_COLLECTION {
            return self.base_value();
        }
        self.state
            .element_index()
            .and_then(|i| self.list.get(i))
            .unwrap_or_default()
    }

    fn is_collection(&self) -> bool {
        true
    }

    fn length(&self) -> usize {
        self.list.len()
    }

    fn immediate_value_pointer(&self, this: &PointerRef) -> Result<Option<PointerRef>> {
        if self.state.index() == WHOLE_COLLECTION {
            return Ok(None);
        }
        self.state
            .registry()
            .create(
                self.name.as_ref(),
                &self.immediate_node(),
                self.state.locale(),
                Some(this),
            )
            .map(Some)
    }

    fn with_index(&self, index: i64) -> Option<PointerRef> {
        Some(Arc::new(self.element(index)))
    }

    fn write_path_segment(&self, buffer: &mut String) {
        if buffer.is_empty() {
            buffer.push('/');
        }
        if self.state.index() != WHOLE_COLLECTION {
            if buffer.ends_with('/') {
                buffer.push('.');
            }
            let _ = write!(buffer, "[{}]", self.state.index() + 1);
        }
    }

    fn set_value(&self, value: Value) -> Result<()> {
        if self.state.index() == WHOLE_COLLECTION {
            return match self.state.parent() {
                Some(parent) => parent.set_value(value),
                None => Err(PathError::unsupported(
                    "collection",
                    "Cannot replace the root collection",
                )),
            };
        }
        let i = self.state.element_index().ok_or_else(|| self.out_of_bounds())?;
        self.list.ensure_len(i + 1);
        self.list.set(i, value);
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        if self.state.index() == WHOLE_COLLECTION {
            return match self.state.parent() {
                Some(parent) => parent.remove(),
                None => Err(PathError::unsupported(
                    "collection",
                    "Cannot remove the root collection",
                )),
            };
        }
        if let Some(i) = self.state.element_index() {
            self.list.remove(i);
        }
        Ok(())
    }

    fn create_path(&self, this: &PointerRef, factory: Option<&dyn ObjectFactory>) -> Result<PointerRef> {
        if self.state.index() == WHOLE_COLLECTION {
            return Ok(this.clone());
        }
        let i = self.state.element_index().ok_or_else(|| self.out_of_bounds())?;
        self.list.ensure_len(i + 1);
        if self.list.get(i).is_none_or(|v| v.is_null()) {
            let parent = self.state.parent().unwrap_or(this);
            let object = factory
                .and_then(|f| f.create_object(parent, self.name.as_ref().map_or("", |n| n.name()), Some(i)))
                .unwrap_or_else(|| Value::Map(Map::new()));
            self.list.set(i, object);
        }
        Ok(this.clone())
    }

    /// Children of every element, each reported under the element's own pointer.
    fn child_pointers(&self, owner: &PointerRef) -> Result<Vec<PointerRef>> {
        if self.state.index() != WHOLE_COLLECTION {
            return Ok(Vec::new());
        }
        let mut children = Vec::new();
        for i in 0..self.list.len() {
            let element = element_of(owner, i as i64)
                .unwrap_or_else(|| Arc::new(self.nested_element(owner, i as i64)));
            children.extend(element.children()?);
        }
        Ok(children)
    }
}

impl CollectionPointer {
    fn nested_element(&self, owner: &PointerRef, index: i64) -> Self {
        Self {
            state: PointerState::child_of(owner).with_index(index),
            name: self.name.clone(),
            list: self.list.clone(),
        }
    }
}

/// `owner` moved to element `index`, when `owner` itself denotes the whole collection.
fn element_of(owner: &PointerRef, index: i64) -> Option<PointerRef> {
    if owner.state().index() != WHOLE_COLLECTION || !owner.is_collection() {
        return None;
    }
    owner.with_index(index)
}

debug_as_path!(CollectionPointer);
