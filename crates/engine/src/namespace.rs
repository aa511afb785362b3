use crate::pointer::PointerRef;
use indexmap::IndexMap;
use std::sync::Arc;

/// Prefix to namespace URI bindings, chained to the bindings of the parent context.
///
/// Lookups try the local bindings, then the namespace context pointer, then the parent.
#[derive(Debug, Clone, Default)]
pub struct NamespaceResolver {
    parent: Option<Arc<NamespaceResolver>>,
    bindings: IndexMap<String, String>,
    pointer: Option<PointerRef>,
}

impl NamespaceResolver {
    pub fn new(parent: Option<Arc<NamespaceResolver>>) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    pub fn register(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    pub fn set_namespace_context_pointer(&mut self, pointer: Option<PointerRef>) {
        self.pointer = pointer;
    }

    pub fn namespace_context_pointer(&self) -> Option<&PointerRef> {
        self.pointer
            .as_ref()
            .or_else(|| self.parent.as_ref()?.namespace_context_pointer())
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<String> {
        if let Some(uri) = self.bindings.get(prefix) {
            return Some(uri.clone());
        }
        if let Some(uri) = self.pointer.as_ref().and_then(|p| p.namespace_uri(prefix)) {
            return Some(uri);
        }
        self.parent.as_ref()?.namespace_uri(prefix)
    }

    /// The first prefix bound to `uri`.
    pub fn prefix(&self, uri: &str) -> Option<String> {
        self.bindings
            .iter()
            .find(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.clone())
            .or_else(|| self.parent.as_ref()?.prefix(uri))
    }

    /// Local bindings only, in registration order.
    pub fn registered(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }
}
