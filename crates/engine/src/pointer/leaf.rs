use super::{NodePointer, PointerState, debug_as_path, value_segment};
use crate::error::{PathError, Result};
use objpath_types::{QName, Value};

/// Value pointer for a scalar.
pub struct LeafPointer {
    state: PointerState,
    name: Option<QName>,
    value: Value,
}

impl LeafPointer {
    pub fn new(state: PointerState, name: Option<QName>, value: Value) -> Self {
        Self { state, name, value }
    }
}

impl NodePointer for LeafPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "leaf"
    }

    fn name(&self) -> Option<QName> {
        self.name.clone()
    }

    fn base_value(&self) -> Value {
        self.value.clone()
    }

    fn immediate_node(&self) -> Value {
        self.value.clone()
    }

    fn is_leaf(&self) -> bool {
        true
    }

    fn write_path_segment(&self, buffer: &mut String) {
        value_segment(buffer);
    }

    fn set_value(&self, value: Value) -> Result<()> {
        match self.state.parent() {
            Some(parent) => parent.set_value(value),
            None => Err(PathError::unsupported(
                "leaf",
                format!("Cannot modify a standalone {}", self.value.kind_name()),
            )),
        }
    }

    fn remove(&self) -> Result<()> {
        match self.state.parent() {
            Some(parent) => parent.remove(),
            None => Err(PathError::unsupported(
                "leaf",
                format!("Cannot remove a standalone {}", self.value.kind_name()),
            )),
        }
    }
}

debug_as_path!(LeafPointer);
