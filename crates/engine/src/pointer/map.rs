use super::property::{PropertyPointer, slot_pointers};
use super::{NodePointer, PointerRef, PointerState, WHOLE_COLLECTION, debug_as_path, value_segment};
use crate::env::ObjectFactory;
use crate::error::{PathError, Result};
use objpath_types::{Map, QName, Value};
use std::sync::Arc;

/// Value pointer for a dynamic map: every key is a child, and any key can be added.
pub struct MapPointer {
    state: PointerState,
    name: Option<QName>,
    map: Map,
}

impl MapPointer {
    pub fn new(state: PointerState, name: Option<QName>, map: Map) -> Self {
        Self { state, name, map }
    }

    fn holder(&self) -> Value {
        Value::Map(self.map.clone())
    }

    fn slot(&self, owner: &PointerRef, name: &QName, index: i64, attribute: bool) -> PropertyPointer {
        PropertyPointer::new(owner, self.holder(), name.clone(), index, attribute)
    }
}

impl NodePointer for MapPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "map"
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
            None => Err(PathError::unsupported("map", "Cannot replace the root object")),
        }
    }

    fn remove(&self) -> Result<()> {
        match self.state.parent() {
            Some(parent) => parent.remove(),
            None => Err(PathError::unsupported("map", "Cannot remove the root object")),
        }
    }

    fn child_pointers(&self, owner: &PointerRef) -> Result<Vec<PointerRef>> {
        let holder = self.holder();
        let mut children = Vec::with_capacity(self.map.len());
        for (key, value) in self.map.entries() {
            slot_pointers(owner, &holder, &key, value, &mut children);
        }
        Ok(children)
    }

    fn attribute_pointers(&self, owner: &PointerRef) -> Result<Vec<PointerRef>> {
        Ok(self
            .map
            .keys()
            .into_iter()
            .map(|key| Arc::new(self.slot(owner, &QName::local(key), WHOLE_COLLECTION, true)) as PointerRef)
            .collect())
    }

    fn named_slot(&self, owner: &PointerRef, name: &QName, attribute: bool) -> Result<Option<PointerRef>> {
        Ok(self
            .map
            .contains_key(&name.to_string())
            .then(|| Arc::new(self.slot(owner, name, WHOLE_COLLECTION, attribute)) as PointerRef))
    }

    fn new_child(
        &self,
        owner: &PointerRef,
        name: &QName,
        index: i64,
        value: Option<Value>,
        factory: Option<&dyn ObjectFactory>,
    ) -> Result<PointerRef> {
        let child: PointerRef = Arc::new(self.slot(owner, name, index, false));
        match value {
            Some(value) => {
                child.set_value(value)?;
                Ok(child)
            }
            None => child.create_path(&child, factory),
        }
    }

    fn new_attribute(&self, owner: &PointerRef, name: &QName) -> Result<PointerRef> {
        let key = name.to_string();
        if !self.map.contains_key(&key) {
            self.map.insert(key, Value::Null);
        }
        Ok(Arc::new(self.slot(owner, name, WHOLE_COLLECTION, true)))
    }
}

debug_as_path!(MapPointer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::PointerExt;
    use crate::registry::PointerRegistry;
    use objpath_types::Locale;

    #[test]
    fn test_children_follow_key_order() {
        let data = Value::map([
            ("b", Value::from(1)),
            ("a", Value::list([Value::from(2), Value::from(3)])),
            ("c", Value::Null),
        ]);
        let root = PointerRegistry::with_defaults()
            .root(&data, &Locale::default())
            .unwrap();
        let paths: Vec<String> = root.children().unwrap().iter().map(|p| p.as_path()).collect();
        assert_eq!(paths, vec!["/b", "/a[1]", "/a[2]", "/c"]);

        let attrs: Vec<String> = root.attributes().unwrap().iter().map(|p| p.as_path()).collect();
        assert_eq!(attrs, vec!["/@b", "/@a", "/@c"]);
    }

    #[test]
    fn test_root_map_cannot_be_replaced() {
        let root = PointerRegistry::with_defaults()
            .root(&Value::map::<&str>([]), &Locale::default())
            .unwrap();
        assert_eq!(root.as_path(), "/");
        assert!(matches!(
            root.set_value(Value::Null),
            Err(PathError::UnsupportedMutation { .. })
        ));
    }
}
