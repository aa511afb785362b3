//! Expression evaluation against pointers.

use crate::context::{
    EvalContext, InitialContext, NodeSetContext, StepContext, apply_predicates, sort_unique,
};
use crate::env::EvalState;
use crate::error::{PathError, Result};
use crate::functions;
use crate::operators;
use crate::pointer::{NodePointer, NullPropertyPointer, PointerExt, PointerRef, WHOLE_COLLECTION};
use crate::value::PathValue;
use objpath_compiler::{
    Axis, BinaryOperator, Expression, LocationPath, NodeTest, UnaryOperator,
};
use objpath_types::Value;
use std::sync::Arc;

/// The lazy result of an expression.
pub enum Computed {
    /// A non-node result. Never holds [`PathValue::Nodes`].
    Value(PathValue),
    Pointer(PointerRef),
    Context(Box<dyn EvalContext>),
}

impl Computed {
    pub fn into_context(self, state: &EvalState) -> Result<Box<dyn EvalContext>> {
        Ok(match self {
            Computed::Context(ctx) => ctx,
            Computed::Pointer(p) => Box::new(InitialContext::new(p)),
            Computed::Value(v) => Box::new(InitialContext::new(value_pointer_for(v, state)?)),
        })
    }
}

/// The single result of an expression: its first node or its scalar value.
pub enum Single {
    Value(PathValue),
    Pointer(PointerRef),
    Empty,
}

/// Wraps a non-node result so that it can be traversed.
fn value_pointer_for(value: PathValue, state: &EvalState) -> Result<PointerRef> {
    let env = &state.env;
    env.registry.root(&value.into_value()?, &env.locale)
}

pub fn compute(expr: &Expression, state: &EvalState) -> Result<Computed> {
    match expr {
        Expression::Literal(s) => Ok(Computed::Value(PathValue::String(s.clone()))),
        Expression::Number(n) => Ok(Computed::Value(PathValue::Number(*n))),
        Expression::LocationPath(path) => Ok(Computed::Context(path_context(path, state)?)),
        Expression::Variable(name) => {
            let pointer = variable(name, state)?;
            Ok(Computed::Context(Box::new(InitialContext::expanding(pointer))))
        }
        Expression::Filter { base, predicates } => {
            let nodes = compute(base, state)?.into_context(state)?.collect_pointers()?;
            let nodes = apply_predicates(nodes, predicates, state)?;
            Ok(Computed::Context(Box::new(NodeSetContext::new(nodes))))
        }
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Union,
            right,
        } => {
            let mut nodes = compute(left, state)?.into_context(state)?.collect_pointers()?;
            nodes.extend(compute(right, state)?.into_context(state)?.collect_pointers()?);
            Ok(Computed::Context(Box::new(NodeSetContext::new(sort_unique(nodes)?))))
        }
        _ => Ok(match evaluate(expr, state)? {
            PathValue::Nodes(nodes) => Computed::Context(Box::new(NodeSetContext::new(nodes))),
            other => Computed::Value(other),
        }),
    }
}

/// Evaluates eagerly, collecting node results.
pub fn evaluate(expr: &Expression, state: &EvalState) -> Result<PathValue> {
    match expr {
        Expression::Literal(s) => Ok(PathValue::String(s.clone())),
        Expression::Number(n) => Ok(PathValue::Number(*n)),
        Expression::LocationPath(_)
        | Expression::Variable(_)
        | Expression::Filter { .. }
        | Expression::BinaryOp {
            op: BinaryOperator::Union,
            ..
        } => Ok(match compute(expr, state)? {
            Computed::Value(v) => v,
            Computed::Pointer(p) => PathValue::Nodes(vec![p]),
            Computed::Context(mut ctx) => PathValue::Nodes(ctx.collect_pointers()?),
        }),
        Expression::FunctionCall { name, args } => functions::call(name, args, state),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::Or,
            right,
        } => Ok(PathValue::Boolean(
            evaluate(left, state)?.to_bool() || evaluate(right, state)?.to_bool(),
        )),
        Expression::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => Ok(PathValue::Boolean(
            evaluate(left, state)?.to_bool() && evaluate(right, state)?.to_bool(),
        )),
        Expression::BinaryOp { left, op, right } => {
            let left = evaluate(left, state)?;
            let right = evaluate(right, state)?;
            operators::evaluate(*op, &left, &right)
        }
        Expression::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => Ok(PathValue::Number(-evaluate(expr, state)?.to_number()?)),
    }
}

/// Resolves the single pointer or value an expression denotes.
///
/// Simple paths are resolved slot by slot and yield a null-property pointer for
/// the first missing slot, which is what path creation builds on.
pub fn compute_value(expr: &Expression, state: &EvalState) -> Result<Single> {
    match expr {
        Expression::LocationPath(path) if path.is_simple_path() => {
            Ok(Single::Pointer(resolve_simple_path(path, state)?))
        }
        Expression::Variable(name) => Ok(Single::Pointer(variable(name, state)?)),
        _ => first(compute(expr, state)?),
    }
}

fn first(computed: Computed) -> Result<Single> {
    Ok(match computed {
        Computed::Value(v) => Single::Value(v),
        Computed::Pointer(p) => Single::Pointer(p),
        Computed::Context(mut ctx) => match ctx.next_pointer()? {
            Some(p) => Single::Pointer(p),
            None => Single::Empty,
        },
    })
}

fn variable(name: &objpath_types::QName, state: &EvalState) -> Result<PointerRef> {
    state
        .env
        .variable_pointer(name)
        .map(|p| Arc::new(p) as PointerRef)
        .ok_or_else(|| PathError::UndefinedVariable(name.to_string()))
}

pub fn path_context(path: &LocationPath, state: &EvalState) -> Result<Box<dyn EvalContext>> {
    let mut ctx: Box<dyn EvalContext> = match &path.start_point {
        Some(start) => compute(start, state)?.into_context(state)?,
        None if path.is_absolute => Box::new(InitialContext::new(state.env.root.clone())),
        None => Box::new(InitialContext::new(state.node.clone())),
    };
    for step in &path.steps {
        ctx = Box::new(StepContext::new(ctx, step.clone(), state.env.clone()));
    }
    Ok(ctx)
}

/// Walks a simple path one named slot at a time.
pub fn resolve_simple_path(path: &LocationPath, state: &EvalState) -> Result<PointerRef> {
    let mut current = if path.is_absolute {
        state.env.root.clone()
    } else {
        state.node.clone()
    };
    for step in &path.steps {
        let NodeTest::Name(name) = &step.node_test else {
            return Err(PathError::StructuralInvariant(format!(
                "step '{}' of a simple path has no name test",
                step.axis
            )));
        };
        let attribute = step.axis == Axis::Attribute;
        let slot = match current.slot(name, attribute)? {
            Some(slot) => slot,
            None => first_matching(&current, &step.node_test, attribute)?.unwrap_or_else(|| {
                Arc::new(NullPropertyPointer::new(&current, name.clone(), attribute))
            }),
        };
        current = match step.predicates.first() {
            None => slot,
            Some(predicate) => {
                let index_state = state.at(current.clone(), 1, 1);
                match evaluate(predicate, &index_state)? {
                    PathValue::Number(n) => {
                        let index = n.round() as i64 - 1;
                        at_index(&slot, &current, name, attribute, index)
                    }
                    other if other.to_bool() => slot,
                    _ => missing(&current, name, attribute, 0),
                }
            }
        };
    }
    Ok(current)
}

fn first_matching(
    parent: &PointerRef,
    test: &NodeTest,
    attribute: bool,
) -> Result<Option<PointerRef>> {
    let candidates = if attribute {
        parent.attributes()?
    } else {
        parent.children()?
    };
    Ok(candidates.into_iter().find(|p| p.test_node(test)))
}

fn at_index(
    slot: &PointerRef,
    parent: &PointerRef,
    name: &objpath_types::QName,
    attribute: bool,
    index: i64,
) -> PointerRef {
    if slot.state().index() == WHOLE_COLLECTION
        && let Some(element) = slot.with_index(index)
    {
        return element;
    }
    if index == 0 && slot.is_actual() {
        return slot.clone();
    }
    missing(parent, name, attribute, index)
}

fn missing(parent: &PointerRef, name: &objpath_types::QName, attribute: bool, index: i64) -> PointerRef {
    let pointer = NullPropertyPointer::new(parent, name.clone(), attribute);
    pointer
        .with_index(index)
        .unwrap_or_else(|| Arc::new(pointer) as PointerRef)
}

/// Value of a computed single result, or `None` when there is none.
pub fn single_value(single: Single) -> Result<Option<Value>> {
    Ok(match single {
        Single::Value(v) => Some(v.into_value()?),
        Single::Pointer(p) => Some(p.value()?),
        Single::Empty => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{BasicVariables, Environment, Variables};
    use crate::registry::PointerRegistry;
    use objpath_compiler::parse_expression;
    use objpath_types::Locale;
    use rstest::rstest;
    use serde_json::json;

    fn state(data: serde_json::Value) -> EvalState {
        let registry = PointerRegistry::with_defaults();
        let root = registry.root(&Value::from(data), &Locale::default()).unwrap();
        let vars = Arc::new(BasicVariables::new());
        vars.declare("limit", Value::from(2));
        vars.declare("names", Value::list(["x".into(), "y".into()]));
        let env = Arc::new(Environment::new(root.clone(), registry, vars));
        EvalState::new(env, root)
    }

    fn library() -> EvalState {
        state(json!({
            "name": "Central",
            "books": [
                {"title": "Dune", "pages": 412, "tags": ["sf", "classic"]},
                {"title": "Emma", "pages": 320, "tags": ["novel"]},
                {"title": "Ubik", "pages": 202, "tags": []}
            ]
        }))
    }

    fn eval_str(state: &EvalState, text: &str) -> String {
        let expr = parse_expression(text).unwrap();
        evaluate(&expr, state).unwrap().to_string_value().unwrap()
    }

    fn paths(state: &EvalState, text: &str) -> Vec<String> {
        let expr = parse_expression(text).unwrap();
        match evaluate(&expr, state).unwrap() {
            PathValue::Nodes(nodes) => nodes.iter().map(|n| n.as_path()).collect(),
            other => panic!("expected nodes, got {:?}", other),
        }
    }

    #[rstest]
    #[case("name", "Central")]
    #[case("books[2]/title", "Emma")]
    #[case("count(books)", "3")]
    #[case("count(//tags)", "3")]
    #[case("sum(books/pages)", "934")]
    #[case("books[pages > 300][last()]/title", "Emma")]
    #[case("books[tags = 'novel']/title", "Emma")]
    #[case("string(books[position() = $limit]/pages)", "320")]
    #[case("concat($names[2], '-', name)", "y-Central")]
    #[case("local-name(books[1]/..)", "")]
    #[case("name(books[3]/title)", "title")]
    #[case("-books[1]/pages mod 100", "-12")]
    fn test_evaluate(#[case] expr: &str, #[case] expected: &str) {
        assert_eq!(eval_str(&library(), expr), expected);
    }

    #[test]
    fn test_axis_paths() {
        let s = library();
        assert_eq!(paths(&s, "books[1]/tags"), vec!["/books[1]/tags[1]", "/books[1]/tags[2]"]);
        assert_eq!(
            paths(&s, "books[2]/following-sibling::*"),
            vec!["/books[3]", "/name"]
        );
        assert_eq!(paths(&s, "books[1]/tags[2]/ancestor::*"), vec!["/books[1]"]);
        assert_eq!(paths(&s, "//title[. = 'Ubik']"), vec!["/books[3]/title"]);
        assert_eq!(paths(&s, "@name"), vec!["/@name"]);
    }

    #[test]
    fn test_union_is_sorted_and_unique() {
        let s = library();
        assert_eq!(
            paths(&s, "books[3]/title | name | books[1]/title | name"),
            vec!["/books[1]/title", "/books[3]/title", "/name"]
        );
    }

    #[test]
    fn test_simple_path_resolution_yields_null_property() {
        let s = library();
        let expr = parse_expression("books[2]/author/name").unwrap();
        let Single::Pointer(pointer) = compute_value(&expr, &s).unwrap() else {
            panic!("expected a pointer");
        };
        assert!(!pointer.is_actual());
        assert_eq!(pointer.as_path(), "/books[2]/author/name");
    }

    #[test]
    fn test_root_collection_elements() {
        let s = state(json!([{"a": 1}, {"a": 2}]));
        assert_eq!(paths(&s, "/.[2]"), vec!["/.[2]"]);
        assert_eq!(eval_str(&s, "/.[2]/a"), "2");
        assert_eq!(paths(&s, "a"), vec!["/.[1]/a", "/.[2]/a"]);
    }

    #[test]
    fn test_unknown_function_and_variable() {
        let s = library();
        let err = evaluate(&parse_expression("nope(1)").unwrap(), &s).unwrap_err();
        assert_eq!(err, PathError::FunctionNotFound { name: "nope".to_string() });
        let err = evaluate(&parse_expression("$missing").unwrap(), &s).unwrap_err();
        assert_eq!(err, PathError::UndefinedVariable("missing".to_string()));
    }
}
