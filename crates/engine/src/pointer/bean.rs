use super::property::{PropertyPointer, slot_pointers};
use super::{NodePointer, PointerRef, PointerState, WHOLE_COLLECTION, debug_as_path, value_segment};
use crate::env::ObjectFactory;
use crate::error::{PathError, Result};
use objpath_types::{Bean, BeanError, QName, Value};
use std::sync::Arc;

/// Value pointer for a bean: the declared properties are its children.
pub struct BeanPointer {
    state: PointerState,
    name: Option<QName>,
    bean: Arc<dyn Bean>,
}

impl BeanPointer {
    pub fn new(state: PointerState, name: Option<QName>, bean: Arc<dyn Bean>) -> Self {
        Self { state, name, bean }
    }

    fn holder(&self) -> Value {
        Value::Bean(self.bean.clone())
    }

    fn declared(&self, name: &QName) -> Result<()> {
        let property = name.to_string();
        if self.bean.has_property(&property) {
            return Ok(());
        }
        Err(PathError::bean(
            self.bean.type_name(),
            BeanError::UnknownProperty {
                type_name: self.bean.type_name().to_string(),
                property,
            },
        ))
    }
}

impl NodePointer for BeanPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "bean"
    }

    fn name(&self) -> Option<QName> {
        self.name.clone()
    }

    fn base_value(&self) -> Value {
        self.holder()
    }

    fn immediate_node(&self) -> Value {
        self.holder()
    }

    fn is_leaf(&self) -> bool {
        false
    }

    fn write_path_segment(&self, buffer: &mut String) {
        value_segment(buffer);
    }

    fn set_value(&self, value: Value) -> Result<()> {
        match self.state.parent() {
            Some(parent) => parent.set_value(value),
            None => Err(PathError::unsupported("bean", "Cannot replace the root object")),
        }
    }

    fn remove(&self) -> Result<()> {
        match self.state.parent() {
            Some(parent) => parent.remove(),
            None => Err(PathError::unsupported("bean", "Cannot remove the root object")),
        }
    }

    fn child_pointers(&self, owner: &PointerRef) -> Result<Vec<PointerRef>> {
        let holder = self.holder();
        let mut children = Vec::new();
        for name in self.bean.property_names() {
            let value = self.bean.get_property(&name).unwrap_or_default();
            slot_pointers(owner, &holder, &name, value, &mut children);
        }
        Ok(children)
    }

    fn attribute_pointers(&self, owner: &PointerRef) -> Result<Vec<PointerRef>> {
        let holder = self.holder();
        Ok(self
            .bean
            .property_names()
            .into_iter()
            .map(|name| {
                Arc::new(PropertyPointer::new(
                    owner,
                    holder.clone(),
                    QName::local(name),
                    WHOLE_COLLECTION,
                    true,
                )) as PointerRef
            })
            .collect())
    }

    fn named_slot(&self, owner: &PointerRef, name: &QName, attribute: bool) -> Result<Option<PointerRef>> {
        if self.declared(name).is_err() {
            return Ok(None);
        }
        Ok(Some(Arc::new(PropertyPointer::new(
            owner,
            self.holder(),
            name.clone(),
            WHOLE_COLLECTION,
            attribute,
        ))))
    }

    fn new_child(
        &self,
        owner: &PointerRef,
        name: &QName,
        index: i64,
        value: Option<Value>,
        factory: Option<&dyn ObjectFactory>,
    ) -> Result<PointerRef> {
        self.declared(name)?;
        let child: PointerRef = Arc::new(PropertyPointer::new(
            owner,
            self.holder(),
            name.clone(),
            index,
            false,
        ));
        match value {
            Some(value) => {
                child.set_value(value)?;
                Ok(child)
            }
            None => child.create_path(&child, factory),
        }
    }

    fn new_attribute(&self, owner: &PointerRef, name: &QName) -> Result<PointerRef> {
        self.declared(name)?;
        Ok(Arc::new(PropertyPointer::new(
            owner,
            self.holder(),
            name.clone(),
            WHOLE_COLLECTION,
            true,
        )))
    }
}

debug_as_path!(BeanPointer);
