//! Pointers: positions inside an object graph.
//!
//! A pointer names one node: the node a map key, bean property, list element or
//! variable refers to. Pointers form a chain through their parents; the chain is
//! what gives a node its path (`as_path`) and its document order (`compare`).
//!
//! Traversal goes through *value pointers*. The value pointer of a property
//! pointer is the pointer the registry builds for the property's value (a map,
//! a bean, a list, a leaf). Value pointers enumerate children on behalf of the
//! pointer they were reached from, so child chains read
//! `root -> property -> property` without value pointers in between.

mod bean;
mod collection;
mod container;
mod leaf;
mod map;
mod null;
mod property;
mod variable;

pub use bean::BeanPointer;
pub use collection::CollectionPointer;
pub use container::ContainerPointer;
pub use leaf::LeafPointer;
pub use map::MapPointer;
pub use null::NullPointer;
pub use property::{NullPropertyPointer, PropertyPointer};
pub use variable::VariablePointer;

use crate::env::ObjectFactory;
use crate::error::{PathError, Result};
use crate::registry::PointerRegistry;
use objpath_compiler::{NodeTest, NodeTypeTest};
use objpath_types::{Locale, QName, Value};
use std::cmp::Ordering;
use std::fmt;
use std::fmt::Write as _;
use std::sync::{Arc, OnceLock};

pub type PointerRef = Arc<dyn NodePointer>;

/// Index of a pointer that denotes a whole collection rather than one element.
pub const WHOLE_COLLECTION: i64 = i64::MIN;

/// Upper bound on value-pointer indirections before the graph is considered malformed.
const MAX_INDIRECTIONS: usize = 1024;
/// Upper bound on the length of a parent chain.
const MAX_DEPTH: usize = 100_000;

/// State every pointer carries regardless of its kind.
#[derive(Clone)]
pub struct PointerState {
    parent: Option<PointerRef>,
    index: i64,
    attribute: bool,
    locale: Locale,
    registry: Arc<PointerRegistry>,
    root_node: OnceLock<Value>,
}

impl PointerState {
    pub fn new(parent: Option<PointerRef>, locale: Locale, registry: Arc<PointerRegistry>) -> Self {
        Self {
            parent,
            index: WHOLE_COLLECTION,
            attribute: false,
            locale,
            registry,
            root_node: OnceLock::new(),
        }
    }

    /// State for a pointer below `parent`, inheriting its locale and registry.
    pub fn child_of(parent: &PointerRef) -> Self {
        let state = parent.state();
        Self::new(Some(parent.clone()), state.locale.clone(), state.registry.clone())
    }

    pub fn with_index(mut self, index: i64) -> Self {
        self.index = index;
        self
    }

    pub fn with_attribute(mut self, attribute: bool) -> Self {
        self.attribute = attribute;
        self
    }

    pub fn parent(&self) -> Option<&PointerRef> {
        self.parent.as_ref()
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn is_attribute(&self) -> bool {
        self.attribute
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn registry(&self) -> &Arc<PointerRegistry> {
        &self.registry
    }

    /// Element position when the index addresses one element.
    pub fn element_index(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }
}

impl Drop for PointerState {
    /// Unlinks the parent chain one level at a time while this is the only holder of each link.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(mut parent) = next {
            next = Arc::get_mut(&mut parent).and_then(|p| p.state_mut().parent.take());
        }
    }
}

/// A position in an object graph.
///
/// Implementations are immutable: moving to another index or creating a node
/// yields a new pointer. Mutations of the underlying graph go through the
/// shared value handles.
pub trait NodePointer: Send + Sync + fmt::Debug {
    fn state(&self) -> &PointerState;

    fn state_mut(&mut self) -> &mut PointerState;

    /// Short identifier of the pointer kind, used for equality and diagnostics.
    fn kind(&self) -> &'static str;

    fn name(&self) -> Option<QName>;

    /// The value this pointer addresses, before any index is applied.
    fn base_value(&self) -> Value;

    /// The value at this pointer's index, without following value pointers.
    fn immediate_node(&self) -> Value;

    fn set_value(&self, value: Value) -> Result<()>;

    fn is_leaf(&self) -> bool {
        self.immediate_node().is_scalar()
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn length(&self) -> usize {
        1
    }

    /// Containers are transparent: name tests and `node()` never select them.
    fn is_container(&self) -> bool {
        false
    }

    fn is_actual(&self) -> bool {
        let index = self.state().index();
        index == WHOLE_COLLECTION || (index >= 0 && (index as u64) < self.length() as u64)
    }

    /// The next pointer in the value chain, or `None` when this pointer is its own value pointer.
    fn immediate_value_pointer(&self, _this: &PointerRef) -> Result<Option<PointerRef>> {
        Ok(None)
    }

    /// This pointer moved to another element of the same collection.
    fn with_index(&self, _index: i64) -> Option<PointerRef> {
        None
    }

    /// Position of this node among the slots of its owner, for document order.
    fn sibling_position(&self) -> Option<usize> {
        None
    }

    /// Textual path from the root, e.g. `/orders[2]/@id`.
    fn as_path(&self) -> String {
        let mut buffer = self.state().parent().map(|p| path_of(p.as_ref())).unwrap_or_default();
        self.write_path_segment(&mut buffer);
        buffer
    }

    /// Appends this pointer's own segment to the path of its parent. `buffer`
    /// is empty at the root.
    fn write_path_segment(&self, buffer: &mut String) {
        if !buffer.ends_with('/') {
            buffer.push('/');
        }
        if self.state().is_attribute() {
            buffer.push('@');
        }
        if let Some(name) = self.name() {
            buffer.push_str(&name.to_string());
        }
        if self.state().index() != WHOLE_COLLECTION && self.is_collection() {
            let _ = write!(buffer, "[{}]", self.state().index() + 1);
        }
    }

    /// Orders two children of this pointer: attributes first, then slot
    /// position, then element index.
    fn compare_child_pointers(&self, a: &PointerRef, b: &PointerRef) -> Result<Ordering> {
        let (sa, sb) = (a.state(), b.state());
        Ok(sb
            .is_attribute()
            .cmp(&sa.is_attribute())
            .then_with(|| a.sibling_position().cmp(&b.sibling_position()))
            .then_with(|| sa.index().cmp(&sb.index())))
    }

    /// Children of the node this value pointer represents, reported as children of `owner`.
    fn child_pointers(&self, _owner: &PointerRef) -> Result<Vec<PointerRef>> {
        Ok(Vec::new())
    }

    fn attribute_pointers(&self, _owner: &PointerRef) -> Result<Vec<PointerRef>> {
        Ok(Vec::new())
    }

    fn namespace_pointers(&self, _owner: &PointerRef) -> Result<Vec<PointerRef>> {
        Ok(Vec::new())
    }

    /// The existing child or attribute slot with the given name.
    fn named_slot(
        &self,
        _owner: &PointerRef,
        _name: &QName,
        _attribute: bool,
    ) -> Result<Option<PointerRef>> {
        Ok(None)
    }

    fn new_child(
        &self,
        owner: &PointerRef,
        name: &QName,
        index: i64,
        _value: Option<Value>,
        _factory: Option<&dyn ObjectFactory>,
    ) -> Result<PointerRef> {
        let position = if index == WHOLE_COLLECTION { 1 } else { index + 1 };
        Err(PathError::unsupported(
            self.kind(),
            format!(
                "Cannot create an object for path {}/{}[{}], operation is not allowed for this type of node",
                owner.as_path(),
                name,
                position
            ),
        ))
    }

    fn new_attribute(&self, owner: &PointerRef, name: &QName) -> Result<PointerRef> {
        Err(PathError::unsupported(
            self.kind(),
            format!(
                "Cannot create an attribute for path {}/@{}, operation is not allowed for this type of node",
                owner.as_path(),
                name
            ),
        ))
    }

    /// Makes sure the node this pointer denotes exists, creating intermediate nodes as needed.
    fn create_path(&self, this: &PointerRef, _factory: Option<&dyn ObjectFactory>) -> Result<PointerRef> {
        Ok(this.clone())
    }

    /// Like [`NodePointer::create_path`], then assigns `value` to the node.
    fn create_path_and_set(
        &self,
        this: &PointerRef,
        _factory: Option<&dyn ObjectFactory>,
        value: Value,
    ) -> Result<PointerRef> {
        self.set_value(value)?;
        Ok(this.clone())
    }

    fn remove(&self) -> Result<()> {
        Err(PathError::unsupported(
            self.kind(),
            format!("Cannot remove {}", self.as_path()),
        ))
    }

    fn namespace_uri(&self, _prefix: &str) -> Option<String> {
        None
    }

    fn default_namespace_uri(&self) -> Option<String> {
        None
    }

    /// Namespace URI of the node itself.
    fn node_namespace_uri(&self) -> Option<String> {
        None
    }
}

/// Renders pointers by their path, keeping parent chains out of debug output.
macro_rules! debug_as_path {
    ($($kind:ty),+ $(,)?) => {$(
        impl std::fmt::Debug for $kind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($kind), $crate::pointer::NodePointer::as_path(self))
            }
        }
    )+};
}
pub(crate) use debug_as_path;

/// Renders the path of `pointer` from its parent chain, root first.
fn path_of(pointer: &dyn NodePointer) -> String {
    let mut current = pointer;
    let mut chain = vec![current];
    while let Some(parent) = current.state().parent() {
        current = parent.as_ref();
        chain.push(current);
    }
    let mut buffer = String::new();
    for link in chain.into_iter().rev() {
        link.write_path_segment(&mut buffer);
    }
    buffer
}

/// Segment of a value pointer: nothing below a parent, `/` at the root.
pub(crate) fn value_segment(buffer: &mut String) {
    if buffer.is_empty() {
        buffer.push('/');
    }
}

/// Operations built on top of [`NodePointer`] that need the pointer's own handle.
pub trait PointerExt {
    /// Follows value indirections to the pointer that can enumerate children.
    fn value_pointer(&self) -> Result<PointerRef>;
    fn value(&self) -> Result<Value>;
    fn children(&self) -> Result<Vec<PointerRef>>;
    fn attributes(&self) -> Result<Vec<PointerRef>>;
    fn namespaces(&self) -> Result<Vec<PointerRef>>;
    fn slot(&self, name: &QName, attribute: bool) -> Result<Option<PointerRef>>;
    fn create_child(
        &self,
        name: &QName,
        index: i64,
        value: Option<Value>,
        factory: Option<&dyn ObjectFactory>,
    ) -> Result<PointerRef>;
    fn create_attribute(&self, name: &QName) -> Result<PointerRef>;
    fn root_node(&self) -> Value;
    fn same_position(&self, other: &PointerRef) -> bool;
    fn compare(&self, other: &PointerRef) -> Result<Ordering>;
    fn test_node(&self, test: &NodeTest) -> bool;
    fn is_language(&self, lang: &str) -> bool;
}

impl PointerExt for PointerRef {
    fn value_pointer(&self) -> Result<PointerRef> {
        let mut current = self.clone();
        for _ in 0..MAX_INDIRECTIONS {
            match current.immediate_value_pointer(&current)? {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(PathError::StructuralInvariant(format!(
            "value of '{}' did not resolve within {} indirections",
            self.as_path(),
            MAX_INDIRECTIONS
        )))
    }

    fn value(&self) -> Result<Value> {
        Ok(self.value_pointer()?.immediate_node())
    }

    fn children(&self) -> Result<Vec<PointerRef>> {
        self.value_pointer()?.child_pointers(self)
    }

    fn attributes(&self) -> Result<Vec<PointerRef>> {
        self.value_pointer()?.attribute_pointers(self)
    }

    fn namespaces(&self) -> Result<Vec<PointerRef>> {
        self.value_pointer()?.namespace_pointers(self)
    }

    fn slot(&self, name: &QName, attribute: bool) -> Result<Option<PointerRef>> {
        self.value_pointer()?.named_slot(self, name, attribute)
    }

    fn create_child(
        &self,
        name: &QName,
        index: i64,
        value: Option<Value>,
        factory: Option<&dyn ObjectFactory>,
    ) -> Result<PointerRef> {
        self.value_pointer()?
            .new_child(self, name, index, value, factory)
    }

    fn create_attribute(&self, name: &QName) -> Result<PointerRef> {
        self.value_pointer()?.new_attribute(self, name)
    }

    fn root_node(&self) -> Value {
        self.state()
            .root_node
            .get_or_init(|| {
                let mut current = self.clone();
                while let Some(parent) = current.state().parent().cloned() {
                    current = parent;
                }
                current.base_value()
            })
            .clone()
    }

    fn same_position(&self, other: &PointerRef) -> bool {
        if Arc::ptr_eq(self, other) {
            return true;
        }
        let (a, b) = (self.state(), other.state());
        self.kind() == other.kind()
            && a.index() == b.index()
            && a.is_attribute() == b.is_attribute()
            && self.name() == other.name()
            && match (a.parent(), b.parent()) {
                (None, None) => self.base_value().same_node(&other.base_value()),
                (Some(_), Some(_)) => true,
                _ => false,
            }
    }

    fn compare(&self, other: &PointerRef) -> Result<Ordering> {
        if let (Some(pa), Some(pb)) = (self.state().parent(), other.state().parent())
            && Arc::ptr_eq(pa, pb)
        {
            return pa.compare_child_pointers(self, other);
        }
        let left = lineage(self)?;
        let right = lineage(other)?;
        for (depth, (a, b)) in left.iter().zip(right.iter()).enumerate() {
            if a.same_position(b) {
                continue;
            }
            let order = match depth {
                0 => compare_roots(a, b)?,
                _ => left[depth - 1].compare_child_pointers(a, b)?,
            };
            if order != Ordering::Equal {
                return Ok(order);
            }
        }
        Ok(left.len().cmp(&right.len()))
    }

    fn test_node(&self, test: &NodeTest) -> bool {
        match test {
            NodeTest::Name(test_name) => {
                if self.is_container() {
                    return false;
                }
                let Some(node_name) = self.name() else {
                    return false;
                };
                let (test_prefix, node_prefix) = (test_name.prefix(), node_name.prefix());
                if test_prefix != node_prefix {
                    let test_uri = test_prefix.and_then(|p| self.namespace_uri(p));
                    let node_uri = match node_prefix {
                        Some(p) => self.namespace_uri(p),
                        None => self.default_namespace_uri(),
                    };
                    if test_uri != node_uri {
                        return false;
                    }
                }
                test_name.is_wildcard() || test_name.name() == node_name.name()
            }
            NodeTest::NodeType(NodeTypeTest::Node) => !self.is_container(),
            NodeTest::NodeType(_) | NodeTest::ProcessingInstruction(_) => false,
        }
    }

    fn is_language(&self, lang: &str) -> bool {
        self.state().locale().is_language(lang)
    }
}

/// The parent chain of `pointer`, root first.
fn lineage(pointer: &PointerRef) -> Result<Vec<PointerRef>> {
    let mut chain = vec![pointer.clone()];
    let mut current = pointer.clone();
    while let Some(parent) = current.state().parent().cloned() {
        if chain.len() >= MAX_DEPTH {
            return Err(PathError::StructuralInvariant(format!(
                "parent chain of '{}' exceeds {} levels",
                pointer.as_path(),
                MAX_DEPTH
            )));
        }
        chain.push(parent.clone());
        current = parent;
    }
    chain.reverse();
    Ok(chain)
}

fn compare_roots(a: &PointerRef, b: &PointerRef) -> Result<Ordering> {
    if a.base_value().same_node(&b.base_value()) {
        return Ok(a.state().index().cmp(&b.state().index()));
    }
    Err(PathError::IncomparablePointers {
        left: a.as_path(),
        right: b.as_path(),
    })
}

/// Strips any number of cell wrappers.
pub(crate) fn deref_cells(mut value: Value) -> Value {
    for _ in 0..MAX_INDIRECTIONS {
        match value {
            Value::Cell(cell) => value = cell.get(),
            other => return other,
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use objpath_types::Cell;

    fn root_of(value: &Value) -> PointerRef {
        PointerRegistry::with_defaults()
            .root(value, &Locale::default())
            .unwrap()
    }

    /// A node whose prefixes resolve through its own bindings.
    struct Element {
        state: PointerState,
        name: QName,
        bindings: Vec<(&'static str, &'static str)>,
    }

    debug_as_path!(Element);

    impl NodePointer for Element {
        fn state(&self) -> &PointerState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut PointerState {
            &mut self.state
        }

        fn kind(&self) -> &'static str {
            "element"
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

        fn set_value(&self, _value: Value) -> Result<()> {
            Ok(())
        }

        fn namespace_uri(&self, prefix: &str) -> Option<String> {
            self.bindings
                .iter()
                .find(|(bound, _)| *bound == prefix)
                .map(|(_, uri)| uri.to_string())
        }
    }

    fn element(name: QName) -> PointerRef {
        let root = root_of(&Value::map::<&str>([]));
        Arc::new(Element {
            state: PointerState::child_of(&root),
            name,
            bindings: vec![("x", "urn:a"), ("y", "urn:a"), ("z", "urn:z")],
        })
    }

    fn name_test(qualified: &str) -> NodeTest {
        NodeTest::Name(QName::parse(qualified))
    }

    #[test]
    fn test_cyclic_cell_is_a_structural_error() {
        let cell = Cell::new(Value::Null);
        cell.set(Value::Cell(cell.clone()));
        let root = root_of(&Value::Cell(cell.clone()));

        let err = root.value_pointer().unwrap_err();
        assert!(matches!(err, PathError::StructuralInvariant(_)), "{:?}", err);
        cell.set(Value::Null);
    }

    #[test]
    fn test_name_tests_on_plain_nodes() {
        let root = root_of(&Value::map([("a", Value::from(1))]));
        let a = root.children().unwrap().remove(0);

        assert!(a.test_node(&name_test("*")));
        assert!(a.test_node(&name_test("a")));
        assert!(!a.test_node(&name_test("b")));
        assert!(a.test_node(&NodeTest::NodeType(NodeTypeTest::Node)));
        assert!(!a.test_node(&NodeTest::NodeType(NodeTypeTest::Text)));
        // Unresolved prefixes resolve to no namespace, like unprefixed names here.
        assert!(a.test_node(&name_test("q:a")));
    }

    #[test]
    fn test_name_tests_resolve_prefixes() {
        let node = element(QName::parse("x:a"));

        assert!(node.test_node(&name_test("x:a")));
        assert!(node.test_node(&name_test("y:a")));
        assert!(node.test_node(&name_test("y:*")));
        assert!(!node.test_node(&name_test("z:a")));
        assert!(!node.test_node(&name_test("q:a")));
        assert!(!node.test_node(&name_test("x:b")));
    }

    #[test]
    fn test_containers_match_no_test() {
        let root = root_of(&Value::map::<&str>([]));
        let container: PointerRef = Arc::new(ContainerPointer::new(
            PointerState::child_of(&root),
            Some(QName::local("a")),
            Cell::new(Value::from(1)),
        ));

        assert!(!container.test_node(&name_test("*")));
        assert!(!container.test_node(&name_test("a")));
        assert!(!container.test_node(&NodeTest::NodeType(NodeTypeTest::Node)));
    }

    #[test]
    fn test_roots_over_one_collection_order_by_index() {
        let root = root_of(&Value::list([Value::from(1), Value::from(2), Value::from(3)]));
        let first = root.with_index(0).unwrap();
        let third = root.with_index(2).unwrap();
        let again = root.with_index(2).unwrap();

        assert_eq!(first.compare(&third).unwrap(), Ordering::Less);
        assert_eq!(third.compare(&first).unwrap(), Ordering::Greater);
        assert_eq!(third.compare(&again).unwrap(), Ordering::Equal);
    }
}
