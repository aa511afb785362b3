//! Candidate pointers along each axis, before node tests and predicates.
//!
//! Forward axes yield in document order; reverse axes yield outwards from the
//! context node.

use crate::error::Result;
use crate::pointer::{PointerExt, PointerRef, WHOLE_COLLECTION};
use objpath_compiler::Axis;
use objpath_types::Value;

pub type PointerIter = Box<dyn Iterator<Item = Result<PointerRef>>>;

fn eager(pointers: Vec<PointerRef>) -> PointerIter {
    Box::new(pointers.into_iter().map(Ok))
}

pub fn axis_pointers(axis: Axis, node: &PointerRef) -> Result<PointerIter> {
    Ok(match axis {
        Axis::SelfAxis => eager(self_pointers(node)),
        Axis::Child => eager(node.children()?),
        Axis::Attribute => eager(node.attributes()?),
        Axis::Namespace => eager(node.namespaces()?),
        Axis::Parent => eager(node.state().parent().cloned().into_iter().collect()),
        Axis::Ancestor => eager(ancestors(node, false)),
        Axis::AncestorOrSelf => eager(ancestors(node, true)),
        Axis::Descendant => Box::new(Descendants::new(node, false)?),
        Axis::DescendantOrSelf => Box::new(Descendants::new(node, true)?),
        Axis::FollowingSibling => eager(following_siblings(node)?),
        Axis::PrecedingSibling => {
            let mut preceding = preceding_siblings(node)?;
            preceding.reverse();
            eager(preceding)
        }
        Axis::Following => eager(following(node)?),
        Axis::Preceding => eager(preceding(node)?),
    })
}

/// The node itself, or each of its elements when it denotes a whole collection.
fn self_pointers(node: &PointerRef) -> Vec<PointerRef> {
    if node.state().index() == WHOLE_COLLECTION && node.is_collection() {
        let elements: Option<Vec<PointerRef>> =
            (0..node.length()).map(|i| node.with_index(i as i64)).collect();
        if let Some(elements) = elements {
            return elements;
        }
    }
    vec![node.clone()]
}

fn ancestors(node: &PointerRef, include_self: bool) -> Vec<PointerRef> {
    let mut result = Vec::new();
    if include_self {
        result.push(node.clone());
    }
    let mut current = node.state().parent().cloned();
    while let Some(parent) = current {
        current = parent.state().parent().cloned();
        result.push(parent);
    }
    result
}

/// Siblings before `node`, in document order.
fn preceding_siblings(node: &PointerRef) -> Result<Vec<PointerRef>> {
    let Some(parent) = node.state().parent() else {
        return Ok(Vec::new());
    };
    if node.state().is_attribute() {
        return Ok(Vec::new());
    }
    Ok(parent
        .children()?
        .into_iter()
        .take_while(|sibling| !sibling.same_position(node))
        .collect())
}

fn following_siblings(node: &PointerRef) -> Result<Vec<PointerRef>> {
    let Some(parent) = node.state().parent() else {
        return Ok(Vec::new());
    };
    if node.state().is_attribute() {
        return Ok(Vec::new());
    }
    Ok(parent
        .children()?
        .into_iter()
        .skip_while(|sibling| !sibling.same_position(node))
        .skip(1)
        .collect())
}

fn following(node: &PointerRef) -> Result<Vec<PointerRef>> {
    let mut result = Vec::new();
    for level in ancestors(node, true) {
        for sibling in following_siblings(&level)? {
            result.push(sibling.clone());
            for descendant in Descendants::new(&sibling, false)? {
                result.push(descendant?);
            }
        }
    }
    Ok(result)
}

/// Nodes before `node` that are not its ancestors, nearest first.
fn preceding(node: &PointerRef) -> Result<Vec<PointerRef>> {
    let mut result = Vec::new();
    for level in ancestors(node, true) {
        for sibling in preceding_siblings(&level)?.into_iter().rev() {
            let subtree = Descendants::new(&sibling, true)?.collect::<Result<Vec<_>>>()?;
            result.extend(subtree.into_iter().rev());
        }
    }
    Ok(result)
}

/// Lazy depth-first walk. A value that is already on the current path is
/// yielded but not entered again, so cyclic graphs terminate.
pub struct Descendants {
    pending_self: Option<PointerRef>,
    stack: Vec<std::vec::IntoIter<PointerRef>>,
    path: Vec<Value>,
}

impl Descendants {
    pub fn new(node: &PointerRef, include_self: bool) -> Result<Self> {
        Ok(Self {
            pending_self: include_self.then(|| node.clone()),
            stack: vec![node.children()?.into_iter()],
            path: vec![node.value()?],
        })
    }

    fn on_path(&self, value: &Value) -> bool {
        !value.is_scalar() && !value.is_null() && self.path.iter().any(|v| v.same_node(value))
    }
}

impl Iterator for Descendants {
    type Item = Result<PointerRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(node) = self.pending_self.take() {
            return Some(Ok(node));
        }
        loop {
            let level = self.stack.last_mut()?;
            let Some(child) = level.next() else {
                self.stack.pop();
                self.path.pop();
                continue;
            };
            let value = match child.value() {
                Ok(value) => value,
                Err(e) => return Some(Err(e)),
            };
            if !value.is_scalar() && !value.is_null() && !self.on_path(&value) {
                match child.children() {
                    Ok(children) => {
                        self.stack.push(children.into_iter());
                        self.path.push(value);
                    }
                    Err(e) => return Some(Err(e)),
                }
            }
            return Some(Ok(child));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PointerRegistry;
    use objpath_types::{Locale, QName};

    fn root(value: &Value) -> PointerRef {
        PointerRegistry::with_defaults()
            .root(value, &Locale::default())
            .unwrap()
    }

    fn paths(iter: PointerIter) -> Vec<String> {
        iter.map(|p| p.unwrap().as_path()).collect()
    }

    fn sample() -> Value {
        Value::map([
            ("a", Value::map([("x", Value::from(1)), ("y", Value::from(2))])),
            ("b", Value::list([Value::from(3), Value::from(4)])),
            ("c", Value::from(5)),
        ])
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = root(&sample());
        assert_eq!(
            paths(axis_pointers(Axis::Descendant, &root).unwrap()),
            vec!["/a", "/a/x", "/a/y", "/b[1]", "/b[2]", "/c"]
        );
    }

    #[test]
    fn test_sibling_axes() {
        let root = root(&sample());
        let b1 = root
            .slot(&QName::local("b"), false)
            .unwrap()
            .unwrap()
            .with_index(0)
            .unwrap();
        assert_eq!(
            paths(axis_pointers(Axis::FollowingSibling, &b1).unwrap()),
            vec!["/b[2]", "/c"]
        );
        assert_eq!(
            paths(axis_pointers(Axis::PrecedingSibling, &b1).unwrap()),
            vec!["/a"]
        );
        assert_eq!(
            paths(axis_pointers(Axis::Preceding, &b1).unwrap()),
            vec!["/a/y", "/a/x", "/a"]
        );
        assert_eq!(
            paths(axis_pointers(Axis::Ancestor, &b1).unwrap()),
            vec!["/"]
        );
    }

    #[test]
    fn test_cycle_is_not_reentered() {
        let data = Value::map([("name", Value::from("loop"))]);
        data.as_map().unwrap().insert("me", data.clone());
        let root = root(&data);
        let found = paths(axis_pointers(Axis::Descendant, &root).unwrap());
        assert_eq!(found, vec!["/name", "/me"]);
    }
}
