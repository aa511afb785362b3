//! The value model of an addressable object graph.
//!
//! Scalars are plain data. Lists, maps and cells are shared handles: cloning a
//! [`Value`] clones the handle, so a mutation made through one pointer is seen by
//! every holder of the same graph.

use crate::bean::Bean;
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Contents of a handle nobody else holds, leaving it empty.
fn take_unique<T: Default>(handle: &mut Arc<RwLock<T>>) -> Option<T> {
    Arc::get_mut(handle)
        .map(|lock| std::mem::take(lock.get_mut().unwrap_or_else(PoisonError::into_inner)))
}

/// Drops nested handles one level at a time, so deep graphs do not exhaust the stack.
fn dismantle(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(mut list) => pending.extend(take_unique(&mut list.0).unwrap_or_default()),
            Value::Map(mut map) => {
                pending.extend(take_unique(&mut map.0).into_iter().flat_map(IndexMap::into_values))
            }
            Value::Cell(mut cell) => pending.extend(take_unique(&mut cell.0)),
            _ => {}
        }
    }
}

/// A node or scalar in an object graph.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// An ordered collection.
    List(List),
    /// A dynamic property map: any key may be read, written or added.
    Map(Map),
    /// An object with a declared set of properties.
    Bean(Arc<dyn Bean>),
    /// A one-element holder that is transparent to navigation.
    Cell(Cell),
    /// A value only understood by a custom pointer factory.
    Foreign(Foreign),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for `Bool`, `Number` and `String`.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    /// Names the runtime kind of the value, for diagnostics.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Map(_) => "map".to_string(),
            Value::Bean(bean) => format!("bean {}", bean.type_name()),
            Value::Cell(_) => "cell".to_string(),
            Value::Foreign(foreign) => foreign.kind().to_string(),
        }
    }

    /// Identity for handles, equality for scalars.
    pub fn same_node(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Cell(a), Value::Cell(b)) => a.ptr_eq(b),
            (Value::Bean(a), Value::Bean(b)) => Arc::ptr_eq(a, b),
            (Value::Foreign(a), Value::Foreign(b)) => a.ptr_eq(b),
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bean(&self) -> Option<&Arc<dyn Bean>> {
        match self {
            Value::Bean(bean) => Some(bean),
            _ => None,
        }
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(List::new(items.into_iter().collect()))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Map::from_entries(entries))
    }

    pub fn cell(value: Value) -> Self {
        Value::Cell(Cell::new(value))
    }

    /// Deep-copies the graph into JSON. Beans become objects of their properties,
    /// cells are unwrapped and foreign values render as their kind name.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::List(list) => Json::Array(list.to_vec().iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.to_json()))
                    .collect(),
            ),
            Value::Bean(bean) => Json::Object(
                bean.property_names()
                    .into_iter()
                    .map(|name| {
                        let v = bean.get_property(&name).unwrap_or_default();
                        (name, v.to_json())
                    })
                    .collect(),
            ),
            Value::Cell(cell) => cell.get().to_json(),
            Value::Foreign(foreign) => Json::String(foreign.kind().to_string()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::List(list) => f.debug_tuple("List").field(&list.to_vec()).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(&map.entries()).finish(),
            Value::Bean(bean) => f.debug_tuple("Bean").field(bean).finish(),
            Value::Cell(cell) => f.debug_tuple("Cell").field(&cell.get()).finish(),
            Value::Foreign(foreign) => write!(f, "Foreign({})", foreign.kind()),
        }
    }
}

/// Scalars compare by value, lists, maps and cells by content, beans and
/// foreign values by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
            (Value::Cell(a), Value::Cell(b)) => a.ptr_eq(b) || a.get() == b.get(),
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.same_node(other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(List::new(items))
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::list(items.into_iter().map(Value::from)),
            Json::Object(entries) => {
                Value::map(entries.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

/// A shared, mutable ordered collection.
#[derive(Clone, Default)]
pub struct List(Arc<RwLock<Vec<Value>>>);

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    pub fn len(&self) -> usize {
        read(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        read(&self.0).get(index).cloned()
    }

    /// Replaces the element at `index`. Returns false if the index is out of range.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match write(&self.0).get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn push(&self, value: Value) {
        write(&self.0).push(value);
    }

    /// Removes the element at `index`, shifting every following element down by one.
    pub fn remove(&self, index: usize) -> Option<Value> {
        let mut items = write(&self.0);
        (index < items.len()).then(|| items.remove(index))
    }

    /// Grows the list to at least `len` elements, padding with nulls.
    pub fn ensure_len(&self, len: usize) {
        let mut items = write(&self.0);
        if items.len() < len {
            items.resize(len, Value::Null);
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        read(&self.0).clone()
    }

    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Drop for List {
    fn drop(&mut self) {
        if let Some(items) = take_unique(&mut self.0) {
            dismantle(items);
        }
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

/// A shared, mutable map from property names to values, in insertion order.
#[derive(Clone, Default)]
pub struct Map(Arc<RwLock<IndexMap<String, Value>>>);

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self(Arc::new(RwLock::new(map)))
    }

    pub fn len(&self) -> usize {
        read(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.0).is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        read(&self.0).contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        read(&self.0).get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        write(&self.0).insert(key.into(), value)
    }

    /// Removes a key, keeping the order of the remaining keys.
    pub fn remove(&self, key: &str) -> Option<Value> {
        write(&self.0).shift_remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        read(&self.0).keys().cloned().collect()
    }

    /// Position of `key` in insertion order.
    pub fn position(&self, key: &str) -> Option<usize> {
        read(&self.0).get_index_of(key)
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        read(&self.0)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn ptr_eq(&self, other: &Map) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Drop for Map {
    fn drop(&mut self) {
        if let Some(entries) = take_unique(&mut self.0) {
            dismantle(entries.into_values().collect());
        }
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

/// A shared one-element holder.
#[derive(Clone, Default)]
pub struct Cell(Arc<RwLock<Value>>);

impl Cell {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn get(&self) -> Value {
        read(&self.0).clone()
    }

    pub fn set(&self, value: Value) {
        *write(&self.0) = value;
    }

    pub fn ptr_eq(&self, other: &Cell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Drop for Cell {
    fn drop(&mut self) {
        if let Some(value) = take_unique(&mut self.0) {
            dismantle(vec![value]);
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell").field(&self.get()).finish()
    }
}

/// An opaque value tagged with a kind name, handled only by custom pointer factories.
#[derive(Clone)]
pub struct Foreign {
    kind: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Foreign {
    pub fn new<T: Any + Send + Sync>(kind: impl Into<Arc<str>>, value: T) -> Self {
        Self {
            kind: kind.into(),
            inner: Arc::new(value),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Foreign) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Foreign({})", self.kind)
    }
}
