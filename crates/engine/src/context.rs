//! Evaluation contexts: pull-based streams of pointers.
//!
//! A location path becomes a chain of contexts, one per step, each pulling from
//! the one before it. Steps without predicates stay lazy; a step with
//! predicates materializes the candidates of one parent node at a time so that
//! `position()` and `last()` are known.

use crate::axes::{self, PointerIter};
use crate::env::{EvalState, Environment};
use crate::error::Result;
use crate::eval;
use crate::pointer::{PointerExt, PointerRef, WHOLE_COLLECTION};
use crate::value::PathValue;
use itertools::Itertools;
use objpath_compiler::{Axis, Expression, Step};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

pub trait EvalContext {
    fn next_pointer(&mut self) -> Result<Option<PointerRef>>;

    /// 1-based position of the pointer most recently returned.
    fn position(&self) -> usize;

    fn collect_pointers(&mut self) -> Result<Vec<PointerRef>> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next_pointer()? {
            nodes.push(node);
        }
        Ok(nodes)
    }
}

/// Yields one pointer, or each element of it when it denotes a whole collection.
pub struct InitialContext {
    pending: std::vec::IntoIter<PointerRef>,
    position: usize,
}

impl InitialContext {
    pub fn new(node: PointerRef) -> Self {
        Self {
            pending: vec![node].into_iter(),
            position: 0,
        }
    }

    pub fn expanding(node: PointerRef) -> Self {
        let nodes = if node.state().index() == WHOLE_COLLECTION && node.is_collection() {
            (0..node.length())
                .map(|i| node.with_index(i as i64))
                .collect::<Option<Vec<_>>>()
                .unwrap_or_else(|| vec![node.clone()])
        } else {
            vec![node]
        };
        Self {
            pending: nodes.into_iter(),
            position: 0,
        }
    }
}

impl EvalContext for InitialContext {
    fn next_pointer(&mut self) -> Result<Option<PointerRef>> {
        let next = self.pending.next();
        if next.is_some() {
            self.position += 1;
        }
        Ok(next)
    }

    fn position(&self) -> usize {
        self.position
    }
}

/// A fixed list of pointers.
pub struct NodeSetContext {
    nodes: std::vec::IntoIter<PointerRef>,
    position: usize,
}

impl NodeSetContext {
    pub fn new(nodes: Vec<PointerRef>) -> Self {
        Self {
            nodes: nodes.into_iter(),
            position: 0,
        }
    }
}

impl EvalContext for NodeSetContext {
    fn next_pointer(&mut self) -> Result<Option<PointerRef>> {
        let next = self.nodes.next();
        if next.is_some() {
            self.position += 1;
        }
        Ok(next)
    }

    fn position(&self) -> usize {
        self.position
    }
}

/// One location step applied to every pointer of the parent context.
pub struct StepContext {
    parent: Box<dyn EvalContext>,
    step: Arc<Step>,
    env: Arc<Environment>,
    current: Option<PointerIter>,
    /// Paths already yielded, for axes whose candidate sets overlap between parents.
    seen: Option<HashSet<String>>,
    /// Second parent node, read ahead to learn whether overlap is possible at all.
    lookahead: Option<PointerRef>,
    started: bool,
    position: usize,
}

impl StepContext {
    pub fn new(parent: Box<dyn EvalContext>, step: Arc<Step>, env: Arc<Environment>) -> Self {
        let overlapping = !matches!(
            step.axis,
            Axis::Child | Axis::Attribute | Axis::SelfAxis | Axis::Namespace
        );
        Self {
            parent,
            step,
            env,
            current: None,
            seen: overlapping.then(HashSet::new),
            lookahead: None,
            started: false,
            position: 0,
        }
    }

    /// Next node of the parent context. A single parent node cannot produce
    /// duplicates, so path tracking is dropped for it.
    fn next_parent(&mut self) -> Result<Option<PointerRef>> {
        if let Some(node) = self.lookahead.take() {
            return Ok(Some(node));
        }
        let node = self.parent.next_pointer()?;
        if !self.started {
            self.started = true;
            if node.is_some() && self.seen.is_some() {
                self.lookahead = self.parent.next_pointer()?;
                if self.lookahead.is_none() {
                    self.seen = None;
                }
            }
        }
        Ok(node)
    }

    fn candidates(&self, node: &PointerRef) -> Result<PointerIter> {
        let step = self.step.clone();
        let tested = axes::axis_pointers(step.axis, node)?
            .filter(move |candidate| candidate.as_ref().map_or(true, |p| p.test_node(&step.node_test)));
        if self.step.predicates.is_empty() {
            return Ok(Box::new(tested));
        }
        let nodes = tested.collect::<Result<Vec<_>>>()?;
        let state = EvalState::new(self.env.clone(), node.clone());
        let filtered = apply_predicates(nodes, &self.step.predicates, &state)?;
        Ok(Box::new(filtered.into_iter().map(Ok)))
    }
}

impl EvalContext for StepContext {
    fn next_pointer(&mut self) -> Result<Option<PointerRef>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                for candidate in current.by_ref() {
                    let candidate = candidate?;
                    if let Some(seen) = self.seen.as_mut()
                        && !seen.insert(candidate.as_path())
                    {
                        continue;
                    }
                    self.position += 1;
                    return Ok(Some(candidate));
                }
                self.current = None;
            }
            match self.next_parent()? {
                Some(node) => self.current = Some(self.candidates(&node)?),
                None => return Ok(None),
            }
        }
    }

    fn position(&self) -> usize {
        self.position
    }
}

/// Filters `nodes` through each predicate in turn. A numeric predicate keeps the node at that position.
pub fn apply_predicates(
    mut nodes: Vec<PointerRef>,
    predicates: &[Expression],
    state: &EvalState,
) -> Result<Vec<PointerRef>> {
    for predicate in predicates {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let position = i + 1;
            let inner = state.at(node.clone(), position, size);
            let keep = match eval::evaluate(predicate, &inner)? {
                PathValue::Number(n) => n == position as f64,
                other => other.to_bool(),
            };
            if keep {
                kept.push(node);
            }
        }
        nodes = kept;
    }
    Ok(nodes)
}

/// Sorts into document order and drops duplicates.
pub fn sort_unique(nodes: Vec<PointerRef>) -> Result<Vec<PointerRef>> {
    let mut nodes = nodes;
    let mut failure = None;
    nodes.sort_by(|a, b| match a.compare(b) {
        Ok(order) => order,
        Err(e) => {
            failure.get_or_insert(e);
            Ordering::Equal
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }
    Ok(nodes.into_iter().unique_by(|p| p.as_path()).collect())
}

/// Adapts a context to an iterator.
pub struct ContextIter(pub Box<dyn EvalContext>);

impl Iterator for ContextIter {
    type Item = Result<PointerRef>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_pointer().transpose()
    }
}
