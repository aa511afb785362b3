//! Pointer identity, ordering and custom pointer factories.

mod common;

use common::fixtures::library;
use common::{TestResult, context, engine};
use objpath::engine::pointer::MapPointer;
use objpath::{
    Foreign, Map, NodePointer, PathError, PointerExt, PointerFactory, PointerRef, PointerRequest,
    Value,
};
use serde_json::json;
use std::cmp::Ordering;
use std::sync::Arc;

fn pointers(ctx: &objpath::QueryContext, xpath: &str) -> Vec<PointerRef> {
    ctx.iterate_pointers(xpath)
        .expect("path should compile")
        .collect::<objpath::Result<_>>()
        .expect("path should evaluate")
}

#[test]
fn test_document_order_is_a_total_order() -> TestResult {
    let ctx = context(library());
    let nodes = pointers(&ctx, "/books | /name | /shelves/* | /books/title");
    assert!(nodes.len() >= 6);

    for a in &nodes {
        assert_eq!(a.compare(a)?, Ordering::Equal);
        for b in &nodes {
            assert_eq!(a.compare(b)?, b.compare(a)?.reverse(), "{:?} vs {:?}", a, b);
            for c in &nodes {
                if a.compare(b)? == Ordering::Less && b.compare(c)? == Ordering::Less {
                    assert_eq!(a.compare(c)?, Ordering::Less);
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_siblings_follow_element_order() -> TestResult {
    let ctx = context(library());
    let books = pointers(&ctx, "/books");
    assert_eq!(books.len(), 3);
    assert_eq!(books[0].compare(&books[2])?, Ordering::Less);
    assert_eq!(books[2].compare(&books[1])?, Ordering::Greater);
    Ok(())
}

#[test]
fn test_is_actual_tracks_collection_bounds() -> TestResult {
    let mut ctx = context(library());
    ctx.set_lenient(true);
    assert!(ctx.get_pointer("/books[3]")?.is_actual());
    assert!(!ctx.get_pointer("/books[5]")?.is_actual());
    assert!(!ctx.get_pointer("/nothing")?.is_actual());
    Ok(())
}

#[test]
fn test_paths_resolve_back_to_their_nodes() -> TestResult {
    let ctx = context(library());
    for pointer in pointers(&ctx, "//*") {
        let path = pointer.as_path();
        let again = ctx.get_pointer(&path)?;
        assert_eq!(again.as_path(), path);
        assert_eq!(again.value()?.to_json(), pointer.value()?.to_json(), "path: {}", path);
    }
    Ok(())
}

#[test]
fn test_pointers_from_different_documents_are_incomparable() -> TestResult {
    let left = context(json!({"a": 1}));
    let right = context(json!({"a": 1}));
    let err = left
        .get_pointer("/a")?
        .compare(&right.get_pointer("/a")?)
        .unwrap_err();
    assert!(matches!(err, PathError::IncomparablePointers { .. }));
    Ok(())
}

/// A point stored outside the value model.
struct Point {
    x: f64,
    y: f64,
}

/// Exposes a foreign `Point` as a map with `x` and `y`.
struct PointFactory;

impl PointerFactory for PointFactory {
    fn order(&self) -> i32 {
        100
    }

    fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef> {
        let Value::Foreign(foreign) = request.value else {
            return None;
        };
        let point = foreign.downcast_ref::<Point>()?;
        let map = Map::from_entries([("x", Value::from(point.x)), ("y", Value::from(point.y))]);
        Some(Arc::new(MapPointer::new(request.state(), request.name(), map)))
    }
}

#[test]
fn test_custom_factory_handles_foreign_values() -> TestResult {
    let engine = engine();
    let point = Value::Foreign(Foreign::new("Point", Point { x: 3.0, y: 4.0 }));

    let err = engine.context(point.clone()).unwrap_err();
    assert_eq!(err, PathError::UnresolvableValue { kind: "Point".to_string() });

    engine.register_factory(Arc::new(PointFactory));
    let ctx = engine.context(point)?;
    assert_eq!(ctx.get_value_as::<f64>("/x + /y")?, Some(7.0));
    assert_eq!(ctx.get_value_as::<f64>("count(/*)")?, Some(2.0));
    Ok(())
}

/// A chain of `depth` maps, each holding the next under `n`.
fn nested_chain(depth: usize) -> Value {
    let root = Map::new();
    let mut current = root.clone();
    for _ in 0..depth {
        let next = Map::new();
        current.insert("n", Value::Map(next.clone()));
        current = next;
    }
    Value::Map(root)
}

#[test]
fn test_deep_graphs_evaluate_on_a_small_stack() {
    const DEPTH: usize = 5_000;
    let worker = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| {
            let ctx = engine().context(nested_chain(DEPTH)).expect("maps have a factory");
            let count = ctx.get_value_as::<f64>("count(//n)").expect("count should evaluate");
            assert_eq!(count, Some(DEPTH as f64));

            let deepest = pointers(&ctx, "//n").pop().expect("chain is not empty");
            assert_eq!(deepest.as_path(), "/n".repeat(DEPTH));
            let parent = ctx.get_pointer("/n/n/..").expect("parent of /n/n resolves");
            assert_eq!(parent.compare(&deepest).expect("same document"), Ordering::Less);
        })
        .expect("spawn worker");
    worker.join().expect("deep evaluation overflowed its stack");
}
