//! A table of extension functions keyed by namespace prefix, name and arity.

use objpath_engine::{Function, Functions};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Key = (Option<String>, String);

struct Entry {
    /// `None` accepts any number of arguments.
    arity: Option<usize>,
    function: Arc<dyn Function>,
}

#[derive(Default)]
pub struct FunctionLibrary {
    functions: HashMap<Key, Vec<Entry>>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function accepting any number of arguments.
    pub fn register(&mut self, prefix: Option<&str>, name: &str, function: impl Function + 'static) {
        self.insert(prefix, name, None, Arc::new(function));
    }

    /// Registers a function for exactly `arity` arguments. Exact matches win over variadic ones.
    pub fn register_with_arity(
        &mut self,
        prefix: Option<&str>,
        name: &str,
        arity: usize,
        function: impl Function + 'static,
    ) {
        self.insert(prefix, name, Some(arity), Arc::new(function));
    }

    pub fn with_function(mut self, prefix: Option<&str>, name: &str, function: impl Function + 'static) -> Self {
        self.register(prefix, name, function);
        self
    }

    fn insert(&mut self, prefix: Option<&str>, name: &str, arity: Option<usize>, function: Arc<dyn Function>) {
        let entries = self
            .functions
            .entry((prefix.map(str::to_string), name.to_string()))
            .or_default();
        entries.retain(|entry| entry.arity != arity);
        entries.push(Entry { arity, function });
    }

    /// Adds every function of `other`, replacing functions with the same signature.
    pub fn extend(&mut self, other: FunctionLibrary) {
        for ((prefix, name), entries) in other.functions {
            for entry in entries {
                self.insert(prefix.as_deref(), &name, entry.arity, entry.function);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Functions for FunctionLibrary {
    fn function(&self, prefix: Option<&str>, name: &str, arity: usize) -> Option<Arc<dyn Function>> {
        let entries = self.functions.get(&(prefix.map(str::to_string), name.to_string()))?;
        entries
            .iter()
            .find(|entry| entry.arity == Some(arity))
            .or_else(|| entries.iter().find(|entry| entry.arity.is_none()))
            .map(|entry| entry.function.clone())
    }
}

impl fmt::Debug for FunctionLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .functions
            .keys()
            .map(|(prefix, name)| match prefix {
                Some(prefix) => format!("{}:{}", prefix, name),
                None => name.clone(),
            })
            .collect();
        names.sort();
        f.debug_struct("FunctionLibrary").field("functions", &names).finish()
    }
}
