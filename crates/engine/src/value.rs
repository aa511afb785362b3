//! Results of expression evaluation and the conversions between them.

use crate::error::Result;
use crate::pointer::{PointerExt, PointerRef};
use objpath_types::Value;

/// The possible result types of an evaluated expression.
#[derive(Debug, Clone)]
pub enum PathValue {
    /// Nodes in document order.
    Nodes(Vec<PointerRef>),
    String(String),
    Number(f64),
    Boolean(bool),
    /// A graph value that did not come from a node, such as an extension function result.
    Object(Value),
}

impl PathValue {
    /// Wraps a graph value, keeping scalars as their typed variants.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Bool(b) => PathValue::Boolean(b),
            Value::Number(n) => PathValue::Number(n),
            Value::String(s) => PathValue::String(s),
            other => PathValue::Object(other),
        }
    }

    /// Coerces the value to a boolean as per XPath 1.0 rules.
    pub fn to_bool(&self) -> bool {
        match self {
            PathValue::Nodes(nodes) => !nodes.is_empty(),
            PathValue::String(s) => !s.is_empty(),
            PathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            PathValue::Boolean(b) => *b,
            PathValue::Object(value) => value_to_bool(value),
        }
    }

    /// Coerces the value to a number as per XPath 1.0 rules.
    pub fn to_number(&self) -> Result<f64> {
        Ok(match self {
            PathValue::Number(n) => *n,
            PathValue::String(s) => parse_number(s),
            PathValue::Boolean(b) => bool_to_number(*b),
            PathValue::Nodes(nodes) => match nodes.first() {
                Some(node) => value_to_number(&node.value()?),
                None => f64::NAN,
            },
            PathValue::Object(value) => value_to_number(value),
        })
    }

    /// Coerces the value to a string as per XPath 1.0 rules.
    pub fn to_string_value(&self) -> Result<String> {
        Ok(match self {
            PathValue::String(s) => s.clone(),
            PathValue::Number(n) => format_number(*n),
            PathValue::Boolean(b) => b.to_string(),
            PathValue::Nodes(nodes) => match nodes.first() {
                Some(node) => value_to_string(&node.value()?),
                None => String::new(),
            },
            PathValue::Object(value) => value_to_string(value),
        })
    }

    /// The graph value of the result: the first node's value for node lists.
    pub fn into_value(self) -> Result<Value> {
        Ok(match self {
            PathValue::Nodes(nodes) => match nodes.first() {
                Some(node) => node.value()?,
                None => Value::Null,
            },
            PathValue::String(s) => Value::String(s),
            PathValue::Number(n) => Value::Number(n),
            PathValue::Boolean(b) => Value::Bool(b),
            PathValue::Object(value) => value,
        })
    }

    pub fn is_nodes(&self) -> bool {
        matches!(self, PathValue::Nodes(_))
    }
}

impl From<bool> for PathValue {
    fn from(b: bool) -> Self {
        PathValue::Boolean(b)
    }
}

impl From<f64> for PathValue {
    fn from(n: f64) -> Self {
        PathValue::Number(n)
    }
}

impl From<String> for PathValue {
    fn from(s: String) -> Self {
        PathValue::String(s)
    }
}

impl From<&str> for PathValue {
    fn from(s: &str) -> Self {
        PathValue::String(s.to_string())
    }
}

fn bool_to_number(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

pub fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::List(list) => !list.is_empty(),
        _ => true,
    }
}

pub fn value_to_number(value: &Value) -> f64 {
    match value {
        Value::Bool(b) => bool_to_number(*b),
        Value::Number(n) => *n,
        Value::String(s) => parse_number(s),
        Value::List(list) => list.get(0).map_or(f64::NAN, |v| value_to_number(&v)),
        Value::Cell(cell) => value_to_number(&cell.get()),
        _ => f64::NAN,
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => s.clone(),
        Value::List(list) => list.get(0).map(|v| value_to_string(&v)).unwrap_or_default(),
        Value::Cell(cell) => value_to_string(&cell.get()),
        Value::Foreign(foreign) => format!("<{}>", foreign.kind()),
        other => other.to_json().to_string(),
    }
}

/// Parses the XPath number grammar: optional minus, digits, optional fraction.
pub fn parse_number(s: &str) -> f64 {
    let t = s.trim();
    let digits = t.strip_prefix('-').unwrap_or(t);
    let well_formed = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
        && digits != ".";
    if !well_formed {
        return f64::NAN;
    }
    t.parse().unwrap_or(f64::NAN)
}

/// Formats a number the way XPath `string()` does: integers without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
