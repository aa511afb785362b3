//! Writes through `QueryContext`: setting, creating and removing nodes.

mod common;

use common::fixtures::{library, numbered};
use common::{TestResult, context, values};
use objpath::{NodePointer, PathError, PointerRef, Value};
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_remove_all_keeps_unselected_elements() -> TestResult {
    let ctx = context(numbered(5));
    ctx.remove_all("/items[id = 1 or id = 3]")?;
    assert_eq!(values(&ctx, "/items/id"), vec![json!(0.0), json!(2.0), json!(4.0)]);
    Ok(())
}

#[test]
fn test_remove_all_of_nothing_is_a_no_op() -> TestResult {
    let ctx = context(numbered(2));
    ctx.remove_all("/items[id > 10]")?;
    assert_eq!(ctx.get_value_as::<f64>("count(/items)")?, Some(2.0));
    Ok(())
}

#[test]
fn test_remove_path() -> TestResult {
    let ctx = context(library());
    ctx.remove_path("/shelves/a")?;
    assert!(ctx.get_value("/shelves/a").unwrap_err().is_not_found());
    assert_eq!(ctx.get_value_as::<f64>("sum(/shelves/*)")?, Some(20.0));

    ctx.remove_path("/books[1]")?;
    assert_eq!(ctx.get_value_as::<String>("/books[1]/title")?, Some("Emma".to_string()));
    Ok(())
}

#[test]
fn test_set_value_on_elements() -> TestResult {
    let ctx = context(numbered(3));
    ctx.set_value("/items[2]/id", 42)?;
    ctx.set_value("/items[3]", json!({"id": 7}))?;
    assert_eq!(values(&ctx, "/items/id"), vec![json!(0.0), json!(42.0), json!(7.0)]);
    Ok(())
}

#[test]
fn test_set_value_is_visible_to_shared_handles() -> TestResult {
    let data = Value::from(numbered(1));
    let ctx = common::engine().context(data.clone())?;
    ctx.set_value("/items[1]/id", "changed")?;
    assert_eq!(data.to_json(), json!({"items": [{"id": "changed"}]}));
    Ok(())
}

#[test]
fn test_set_value_rejects_computed_results() {
    let ctx = context(library());
    let err = ctx.set_value("count(/books)", 1).unwrap_err();
    assert!(matches!(err, PathError::UnsupportedMutation { .. }));
}

#[test]
fn test_create_path_builds_missing_nodes() -> TestResult {
    let ctx = context(json!({}));
    let pointer = ctx.create_path_and_set_value("/order/lines[3]/qty", 5)?;
    assert_eq!(pointer.as_path(), "/order/lines[3]/qty");
    assert_eq!(ctx.get_value_as::<f64>("count(/order/lines)")?, Some(3.0));
    assert_eq!(ctx.get_value_as::<f64>("/order/lines[3]/qty")?, Some(5.0));
    Ok(())
}

#[test]
fn test_create_path_uses_object_factory() -> TestResult {
    let mut ctx = context(json!({}));
    ctx.set_factory(Arc::new(|_parent: &PointerRef, name: &str, _index: Option<usize>| {
        (name == "address").then(|| Value::from(json!({"country": "NO"})))
    }));
    ctx.create_path_and_set_value("/address/city", "Oslo")?;
    assert_eq!(ctx.get_value_as::<String>("/address/country")?, Some("NO".to_string()));
    assert_eq!(ctx.get_value_as::<String>("/address/city")?, Some("Oslo".to_string()));
    Ok(())
}

#[test]
fn test_create_path_rejects_complex_paths() {
    let ctx = context(library());
    for xpath in ["/books[title = 'Emma']/isbn", "//title", "count(/books)"] {
        assert!(
            matches!(ctx.create_path(xpath), Err(PathError::InvalidMutationPath { .. })),
            "xpath: {}",
            xpath
        );
    }
}

#[test]
fn test_rejected_creation_leaves_the_graph_unchanged() -> TestResult {
    let data = Value::from(library());
    let ctx = common::engine().context(data.clone())?;
    let before = data.to_json();

    for xpath in ["/books[title = 'Emma']/isbn", "/shelves//d", "/books[1]/../missing"] {
        let err = ctx.create_path_and_set_value(xpath, "x").unwrap_err();
        assert!(matches!(err, PathError::InvalidMutationPath { .. }), "xpath: {}", xpath);
    }
    assert_eq!(data.to_json(), before);
    Ok(())
}
