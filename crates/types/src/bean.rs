//! Objects with a declared property set.

use crate::value::{Value, read, write};
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BeanError {
    #[error("no property '{property}' on {type_name}")]
    UnknownProperty { type_name: String, property: String },

    #[error("property '{property}' on {type_name} is read-only")]
    ReadOnly { type_name: String, property: String },

    #[error("cannot assign {value_kind} to property '{property}': {message}")]
    Rejected {
        property: String,
        value_kind: String,
        message: String,
    },
}

/// An object whose properties are known up front.
///
/// Implementations use interior mutability: the graph is shared between pointers
/// and every mutation goes through `&self`.
pub trait Bean: Send + Sync + fmt::Debug {
    fn type_name(&self) -> &str;

    /// Property names in declaration order.
    fn property_names(&self) -> Vec<String>;

    /// `None` if the bean has no such property; `Some(Value::Null)` if it has one
    /// with no value.
    fn get_property(&self, name: &str) -> Option<Value>;

    fn set_property(&self, name: &str, value: Value) -> Result<(), BeanError>;

    /// A fresh instance suitable for the named property, used when a path is
    /// created through a missing intermediate node.
    fn new_property_value(&self, _name: &str) -> Option<Value> {
        None
    }

    fn has_property(&self, name: &str) -> bool {
        self.property_names().iter().any(|p| p == name)
    }
}

type Constructor = Arc<dyn Fn() -> Value + Send + Sync>;

/// A general-purpose [`Bean`] backed by an ordered property table.
pub struct Record {
    type_name: String,
    properties: RwLock<IndexMap<String, Value>>,
    constructors: IndexMap<String, Constructor>,
}

impl Record {
    pub fn builder(type_name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            type_name: type_name.into(),
            properties: IndexMap::new(),
            constructors: IndexMap::new(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Bean(Arc::new(self))
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = read(&self.properties);
        let mut s = f.debug_struct(&self.type_name);
        for (name, value) in props.iter() {
            // Cyclic graphs would recurse forever through nested beans.
            match value {
                Value::Bean(bean) => s.field(name, &format_args!("<{}>", bean.type_name())),
                other => s.field(name, other),
            };
        }
        s.finish()
    }
}

impl Bean for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property_names(&self) -> Vec<String> {
        read(&self.properties).keys().cloned().collect()
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        read(&self.properties).get(name).cloned()
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), BeanError> {
        let mut props = write(&self.properties);
        match props.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(BeanError::UnknownProperty {
                type_name: self.type_name.clone(),
                property: name.to_string(),
            }),
        }
    }

    fn new_property_value(&self, name: &str) -> Option<Value> {
        self.constructors.get(name).map(|make| make())
    }
}

pub struct RecordBuilder {
    type_name: String,
    properties: IndexMap<String, Value>,
    constructors: IndexMap<String, Constructor>,
}

impl RecordBuilder {
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Declares a property that starts out null and is populated with `make()`
    /// when a path is created through it.
    pub fn nested<F>(mut self, name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        self.properties.entry(name.clone()).or_insert(Value::Null);
        self.constructors.insert(name, Arc::new(make));
        self
    }

    pub fn build(self) -> Record {
        Record {
            type_name: self.type_name,
            properties: RwLock::new(self.properties),
            constructors: self.constructors,
        }
    }

    pub fn into_value(self) -> Value {
        self.build().into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Value {
        Record::builder("Address")
            .property("street", Value::Null)
            .into_value()
    }

    #[test]
    fn test_record_properties_in_declaration_order() {
        let person = Record::builder("Person")
            .property("name", "Ada")
            .property("age", 36)
            .nested("address", address)
            .build();
        assert_eq!(person.property_names(), vec!["name", "age", "address"]);
        assert_eq!(person.get_property("address"), Some(Value::Null));
        assert_eq!(person.get_property("missing"), None);
    }

    #[test]
    fn test_record_rejects_unknown_property() {
        let person = Record::builder("Person").property("name", "Ada").build();
        assert!(person.set_property("name", Value::from("Grace")).is_ok());
        let err = person.set_property("email", Value::from("x")).unwrap_err();
        assert!(matches!(err, BeanError::UnknownProperty { .. }));
    }

    #[test]
    fn test_nested_constructor() {
        let person = Record::builder("Person").nested("address", address).build();
        let created = person.new_property_value("address").unwrap();
        assert_eq!(created.as_bean().unwrap().type_name(), "Address");
        assert!(person.new_property_value("name").is_none());
    }
}
