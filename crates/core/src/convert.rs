//! Conversion of query results to caller-requested Rust types.

use objpath_engine::value::{parse_number, value_to_string};
use objpath_engine::{PathError, Result};
use objpath_types::{List, Map, Value};

/// A type a query result can be converted to.
pub trait Coerce: Sized {
    /// Name used in conversion errors.
    const TYPE_NAME: &'static str;

    /// `None` when `value` has no sensible representation as `Self`.
    fn from_value(value: &Value) -> Option<Self>;

    fn coerce(value: Value) -> Result<Self> {
        let value = match value {
            Value::Cell(cell) => cell.get(),
            other => other,
        };
        Self::from_value(&value).ok_or_else(|| PathError::TypeConversion {
            from: value.kind_name(),
            to: Self::TYPE_NAME.to_string(),
        })
    }
}

impl Coerce for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl Coerce for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(value_to_string(value)),
            _ => None,
        }
    }
}

impl Coerce for f64 {
    const TYPE_NAME: &'static str = "number";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => {
                let n = parse_number(s);
                (!n.is_nan()).then_some(n)
            }
            _ => None,
        }
    }
}

impl Coerce for i64 {
    const TYPE_NAME: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        let n = f64::from_value(value)?;
        (n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
    }
}

impl Coerce for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0 && !n.is_nan()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

impl Coerce for List {
    const TYPE_NAME: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list().cloned()
    }
}

impl Coerce for Map {
    const TYPE_NAME: &'static str = "map";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_map().cloned()
    }
}

/// Element values of a list, or a scalar as a one-element vector.
impl Coerce for Vec<Value> {
    const TYPE_NAME: &'static str = "vector";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(list) => Some(list.to_vec()),
            Value::Bool(_) | Value::Number(_) | Value::String(_) => Some(vec![value.clone()]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::from(3.0), Some(3))]
    #[case(Value::from("42"), Some(42))]
    #[case(Value::from(2.5), None)]
    #[case(Value::from("forty"), None)]
    fn test_integer(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_eq!(i64::from_value(&value), expected);
    }

    #[test]
    fn test_conversion_error_names_both_types() {
        let err = bool::coerce(Value::map([("a", Value::from(1))])).unwrap_err();
        assert_eq!(
            err,
            PathError::TypeConversion {
                from: "map".to_string(),
                to: "boolean".to_string()
            }
        );
    }

    #[test]
    fn test_cells_are_unwrapped() {
        let value = Value::cell(Value::from("true"));
        assert!(bool::coerce(value).unwrap());
    }
}
