use super::{NodePointer, PointerState, debug_as_path, value_segment};
use crate::error::{PathError, Result};
use objpath_types::{QName, Value};

/// Value pointer for an absent value.
pub struct NullPointer {
    state: PointerState,
    name: Option<QName>,
}

impl NullPointer {
    pub fn new(state: PointerState, name: Option<QName>) -> Self {
        Self { state, name }
    }
}

impl NodePointer for NullPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "null"
    }

    fn name(&self) -> Option<QName> {
        self.name.clone()
    }

    fn base_value(&self) -> Value {
        Value::Null
    }

    fn immediate_node(&self) -> Value {
        Value::Null
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn length(&self) -> usize {
        0
    }

    fn write_path_segment(&self, buffer: &mut String) {
        value_segment(buffer);
    }

    fn set_value(&self, value: Value) -> Result<()> {
        match self.state.parent() {
            Some(parent) => parent.set_value(value),
            None => Err(PathError::unsupported("null", "Cannot set the value of a null root")),
        }
    }

    fn remove(&self) -> Result<()> {
        match self.state.parent() {
            Some(parent) => parent.remove(),
            None => Ok(()),
        }
    }
}

debug_as_path!(NullPointer);
