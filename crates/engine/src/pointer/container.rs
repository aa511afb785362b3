use super::{NodePointer, PointerRef, PointerState, debug_as_path, value_segment};
use crate::error::Result;
use objpath_types::{Cell, QName, Value};

/// A transparent wrapper around a [`Cell`]. Traversal and name tests look through it.
pub struct ContainerPointer {
    state: PointerState,
    name: Option<QName>,
    cell: Cell,
}

impl ContainerPointer {
    pub fn new(state: PointerState, name: Option<QName>, cell: Cell) -> Self {
        Self { state, name, cell }
    }
}

impl NodePointer for ContainerPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "container"
    }

    fn name(&self) -> Option<QName> {
        self.name.clone()
    }

    fn base_value(&self) -> Value {
        self.cell.get()
    }

    fn immediate_node(&self) -> Value {
        self.cell.get()
    }

    fn is_container(&self) -> bool {
        true
    }

    fn write_path_segment(&self, buffer: &mut String) {
        value_segment(buffer);
    }

    fn immediate_value_pointer(&self, this: &PointerRef) -> Result<Option<PointerRef>> {
        self.state
            .registry()
            .create(
                self.name.as_ref(),
                &self.cell.get(),
                self.state.locale(),
                Some(this),
            )
            .map(Some)
    }

    fn set_value(&self, value: Value) -> Result<()> {
        self.cell.set(value);
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.cell.set(Value::Null);
        Ok(())
    }
}

debug_as_path!(ContainerPointer);
