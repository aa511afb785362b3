use super::{NodePointer, PointerRef, PointerState, WHOLE_COLLECTION, debug_as_path, deref_cells};
use crate::env::ObjectFactory;
use crate::error::{PathError, Result};
use crate::pointer::PointerExt;
use objpath_types::{List, Map, QName, Value};
use std::fmt::Write as _;
use std::sync::Arc;

/// A named slot of a map or bean: one key or property, optionally narrowed to one element.
#[derive(Clone)]
pub struct PropertyPointer {
    state: PointerState,
    name: QName,
    /// The map or bean that holds the slot.
    holder: Value,
}

enum Target {
    Whole,
    Element(usize),
}

impl PropertyPointer {
    pub fn new(owner: &PointerRef, holder: Value, name: QName, index: i64, attribute: bool) -> Self {
        Self {
            state: PointerState::child_of(owner)
                .with_index(index)
                .with_attribute(attribute),
            name,
            holder,
        }
    }

    fn key(&self) -> String {
        self.name.to_string()
    }

    fn slot_value(&self) -> Value {
        let key = self.key();
        match &self.holder {
            Value::Map(map) => map.get(&key),
            Value::Bean(bean) => bean.get_property(&key),
            _ => None,
        }
        .unwrap_or_default()
    }

    fn write_slot(&self, value: Value) -> Result<()> {
        if let Value::Cell(cell) = self.slot_value() {
            cell.set(value);
            return Ok(());
        }
        let key = self.key();
        match &self.holder {
            Value::Map(map) => {
                map.insert(key, value);
                Ok(())
            }
            Value::Bean(bean) => bean
                .set_property(&key, value)
                .map_err(|e| PathError::bean(bean.type_name(), e)),
            other => Err(PathError::unsupported(
                "property",
                format!("Cannot set property {} on {}", key, other.kind_name()),
            )),
        }
    }

    fn target(&self) -> Result<Target> {
        let index = self.state.index();
        if index == WHOLE_COLLECTION {
            return Ok(Target::Whole);
        }
        self.state
            .element_index()
            .map(Target::Element)
            .ok_or_else(|| {
                PathError::unsupported(
                    "property",
                    format!("Index {} is out of bounds for {}", index + 1, self.as_path()),
                )
            })
    }

    /// The list an element index refers to, creating it in a null slot.
    fn element_list(&self, create: bool) -> Result<Option<List>> {
        match deref_cells(self.slot_value()) {
            Value::List(list) => Ok(Some(list)),
            Value::Null if create => {
                let list = List::new(Vec::new());
                self.write_slot(Value::List(list.clone()))?;
                Ok(Some(list))
            }
            _ => Ok(None),
        }
    }

    fn new_object(&self, factory: Option<&dyn ObjectFactory>) -> Value {
        let index = self.state.element_index();
        if let (Some(factory), Some(parent)) = (factory, self.state.parent())
            && let Some(object) = factory.create_object(parent, self.name.name(), index)
        {
            return object;
        }
        if let Value::Bean(bean) = &self.holder
            && let Some(object) = bean.new_property_value(&self.key())
        {
            return object;
        }
        Value::Map(Map::new())
    }
}

impl NodePointer for PropertyPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "property"
    }

    fn name(&self) -> Option<QName> {
        Some(self.name.clone())
    }

    fn base_value(&self) -> Value {
        self.slot_value()
    }

    fn immediate_node(&self) -> Value {
        let slot = self.slot_value();
        match self.target() {
            Ok(Target::Whole) => slot,
            Ok(Target::Element(i)) => match deref_cells(slot.clone()) {
                Value::List(list) => list.get(i).unwrap_or_default(),
                _ if i == 0 => slot,
                _ => Value::Null,
            },
            Err(_) => Value::Null,
        }
    }

    fn set_value(&self, value: Value) -> Result<()> {
        match self.target()? {
            Target::Whole => self.write_slot(value),
            Target::Element(i) => {
                if let Some(list) = self.element_list(i > 0)? {
                    list.ensure_len(i + 1);
                    list.set(i, value);
                    Ok(())
                } else if i == 0 {
                    self.write_slot(value)
                } else {
                    Err(PathError::unsupported(
                        "property",
                        format!("Cannot set {}: the property is not a collection", self.as_path()),
                    ))
                }
            }
        }
    }

    fn is_collection(&self) -> bool {
        matches!(deref_cells(self.slot_value()), Value::List(_))
    }

    fn length(&self) -> usize {
        match deref_cells(self.slot_value()) {
            Value::List(list) => list.len(),
            Value::Null => 0,
            _ => 1,
        }
    }

    fn immediate_value_pointer(&self, this: &PointerRef) -> Result<Option<PointerRef>> {
        let registry = self.state.registry();
        registry
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

    fn sibling_position(&self) -> Option<usize> {
        let key = self.key();
        match &self.holder {
            Value::Map(map) => map.position(&key),
            Value::Bean(bean) => bean.property_names().iter().position(|p| *p == key),
            _ => None,
        }
    }

    fn create_path(&self, this: &PointerRef, factory: Option<&dyn ObjectFactory>) -> Result<PointerRef> {
        match self.target()? {
            Target::Whole => {
                if deref_cells(self.slot_value()).is_null() {
                    self.write_slot(self.new_object(factory))?;
                }
            }
            Target::Element(i) => match self.element_list(i > 0)? {
                Some(list) => {
                    list.ensure_len(i + 1);
                    if list.get(i).is_none_or(|v| v.is_null()) {
                        list.set(i, self.new_object(factory));
                    }
                }
                None => {
                    if i > 0 {
                        return Err(PathError::unsupported(
                            "property",
                            format!("Cannot create {}: the property is not a collection", self.as_path()),
                        ));
                    }
                    if deref_cells(self.slot_value()).is_null() {
                        self.write_slot(self.new_object(factory))?;
                    }
                }
            },
        }
        Ok(this.clone())
    }

    fn remove(&self) -> Result<()> {
        let whole = || match &self.holder {
            Value::Map(map) => {
                map.remove(&self.key());
                Ok(())
            }
            _ => self.write_slot(Value::Null),
        };
        match self.target()? {
            Target::Whole => whole(),
            Target::Element(i) => match deref_cells(self.slot_value()) {
                Value::List(list) => {
                    list.remove(i);
                    Ok(())
                }
                _ if i == 0 => whole(),
                _ => Ok(()),
            },
        }
    }
}

/// A named slot that does not exist (yet). Creating it builds the missing nodes.
#[derive(Clone)]
pub struct NullPropertyPointer {
    state: PointerState,
    name: QName,
}

impl NullPropertyPointer {
    pub fn new(parent: &PointerRef, name: QName, attribute: bool) -> Self {
        Self {
            state: PointerState::child_of(parent).with_attribute(attribute),
            name,
        }
    }

    fn parent(&self) -> Result<&PointerRef> {
        self.state.parent().ok_or_else(|| {
            PathError::StructuralInvariant(format!("'{}' has no parent", self.name))
        })
    }
}

impl NodePointer for NullPropertyPointer {
    fn state(&self) -> &PointerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PointerState {
        &mut self.state
    }

    fn kind(&self) -> &'static str {
        "null-property"
    }

    fn name(&self) -> Option<QName> {
        Some(self.name.clone())
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

    fn is_actual(&self) -> bool {
        false
    }

    fn with_index(&self, index: i64) -> Option<PointerRef> {
        Some(Arc::new(Self {
            state: self.state.clone().with_index(index),
            ..self.clone()
        }))
    }

    fn write_path_segment(&self, buffer: &mut String) {
        if !buffer.ends_with('/') {
            buffer.push('/');
        }
        if self.state.is_attribute() {
            buffer.push('@');
        }
        buffer.push_str(&self.name.to_string());
        if self.state.index() != WHOLE_COLLECTION {
            let _ = write!(buffer, "[{}]", self.state.index() + 1);
        }
    }

    fn set_value(&self, value: Value) -> Result<()> {
        let parent = self.parent()?;
        if parent.is_container() {
            return Err(PathError::unsupported(
                "property",
                format!("Cannot set property {}, the target object is null", self.as_path()),
            ));
        }
        match parent.value()? {
            Value::Map(map) => PropertyPointer::new(
                parent,
                Value::Map(map),
                self.name.clone(),
                self.state.index(),
                self.state.is_attribute(),
            )
            .set_value(value),
            Value::Null => Err(PathError::unsupported(
                "property",
                format!("Cannot set property {}, the target object is null", self.as_path()),
            )),
            _ => Err(PathError::unsupported(
                "property",
                format!(
                    "Cannot set property {}, path does not match a changeable location",
                    self.as_path()
                ),
            )),
        }
    }

    fn create_path(&self, _this: &PointerRef, factory: Option<&dyn ObjectFactory>) -> Result<PointerRef> {
        let parent = self.parent()?;
        let parent = parent.create_path(parent, factory)?;
        if self.state.is_attribute() {
            parent.create_attribute(&self.name)
        } else {
            parent.create_child(&self.name, self.state.index(), None, factory)
        }
    }

    fn create_path_and_set(
        &self,
        _this: &PointerRef,
        factory: Option<&dyn ObjectFactory>,
        value: Value,
    ) -> Result<PointerRef> {
        let parent = self.parent()?;
        let parent = parent.create_path(parent, factory)?;
        if self.state.is_attribute() {
            let attribute = parent.create_attribute(&self.name)?;
            attribute.set_value(value)?;
            Ok(attribute)
        } else {
            parent.create_child(&self.name, self.state.index(), Some(value), factory)
        }
    }

    fn remove(&self) -> Result<()> {
        Ok(())
    }
}

debug_as_path!(PropertyPointer, NullPropertyPointer);

/// Pointers for one slot of `holder`: one per element for list values, otherwise one for the whole slot.
pub(crate) fn slot_pointers(
    owner: &PointerRef,
    holder: &Value,
    name: &str,
    value: Value,
    out: &mut Vec<PointerRef>,
) {
    let name = QName::local(name);
    match deref_cells(value) {
        Value::List(list) => {
            for i in 0..list.len() {
                out.push(Arc::new(PropertyPointer::new(
                    owner,
                    holder.clone(),
                    name.clone(),
                    i as i64,
                    false,
                )));
            }
        }
        _ => out.push(Arc::new(PropertyPointer::new(
            owner,
            holder.clone(),
            name,
            WHOLE_COLLECTION,
            false,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PointerRegistry;
    use objpath_types::Locale;

    fn root(value: Value) -> PointerRef {
        PointerRegistry::with_defaults()
            .root(&value, &Locale::default())
            .unwrap()
    }

    fn slot(root: &PointerRef, name: &str) -> PointerRef {
        root.slot(&QName::local(name), false).unwrap().unwrap()
    }

    #[test]
    fn test_element_paths_and_values() {
        let root = root(Value::map([("tags", Value::list(["a".into(), "b".into()]))]));
        let tags = slot(&root, "tags");
        assert_eq!(tags.as_path(), "/tags");
        let second = tags.with_index(1).unwrap();
        assert_eq!(second.as_path(), "/tags[2]");
        assert_eq!(second.value().unwrap(), Value::from("b"));
        assert!(!tags.with_index(5).unwrap().is_actual());
    }

    #[test]
    fn test_set_element_expands_list() {
        let data = Value::map([("tags", Value::list(["a".into()]))]);
        let root = root(data.clone());
        slot(&root, "tags").with_index(3).unwrap().set_value("d".into()).unwrap();
        let tags = data.as_map().unwrap().get("tags").unwrap();
        assert_eq!(
            tags,
            Value::list(["a".into(), Value::Null, Value::Null, "d".into()])
        );
    }

    #[test]
    fn test_remove_element_and_key() {
        let data = Value::map([
            ("tags", Value::list(["a".into(), "b".into(), "c".into()])),
            ("name", "x".into()),
        ]);
        let root = root(data.clone());
        slot(&root, "tags").with_index(1).unwrap().remove().unwrap();
        slot(&root, "name").remove().unwrap();
        let map = data.as_map().unwrap();
        assert_eq!(map.get("tags").unwrap(), Value::list(["a".into(), "c".into()]));
        assert!(!map.contains_key("name"));
    }

    #[test]
    fn test_null_property_creates_chain() {
        let data = Value::map([("a", Value::Null)]);
        let root = root(data.clone());
        let a: PointerRef = slot(&root, "a");
        let missing: PointerRef = Arc::new(NullPropertyPointer::new(&a, QName::local("b"), false));
        let deeper: PointerRef =
            Arc::new(NullPropertyPointer::new(&missing, QName::local("c"), false));
        assert_eq!(deeper.as_path(), "/a/b/c");
        let created = deeper.create_path_and_set(&deeper, None, 5.into()).unwrap();
        assert_eq!(created.as_path(), "/a/b/c");
        assert_eq!(created.value().unwrap(), Value::from(5));
    }
}
