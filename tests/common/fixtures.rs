use objpath::{Record, Value};
use serde_json::{Value as Json, json};

/// A small library: a name, a list of books and a shelf map.
pub fn library() -> Json {
    json!({
        "name": "Central",
        "books": [
            {"title": "Dune", "year": 1965, "tags": ["sf", "classic"]},
            {"title": "Emma", "year": 1815, "tags": ["classic"]},
            {"title": "Neuromancer", "year": 1984, "tags": ["sf"]}
        ],
        "shelves": {"a": 10, "b": 20}
    })
}

/// A document with one list of `n` numbered items.
pub fn numbered(n: usize) -> Json {
    let items: Vec<Json> = (0..n).map(|i| json!({"id": i})).collect();
    json!({"items": items})
}

/// A bean with a declared address that is created on demand.
pub fn customer() -> Value {
    Record::builder("Customer")
        .property("name", "Ada")
        .property("vip", true)
        .nested("address", || {
            Record::builder("Address")
                .property("street", Value::Null)
                .property("city", Value::Null)
                .into_value()
        })
        .into_value()
}
