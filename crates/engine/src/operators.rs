//! Comparison and arithmetic operators.
//!
//! Node lists compare existentially, through the typed values of their nodes,
//! so `count = 3` matches a numeric property without a string round trip.

use crate::error::Result;
use crate::pointer::PointerExt;
use crate::value::PathValue;
use objpath_compiler::BinaryOperator;
use objpath_types::Value;

pub fn evaluate(op: BinaryOperator, left: &PathValue, right: &PathValue) -> Result<PathValue> {
    use BinaryOperator::*;
    Ok(match op {
        Equals => PathValue::Boolean(compare_equality(left, right, true)?),
        NotEquals => PathValue::Boolean(compare_equality(left, right, false)?),
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            PathValue::Boolean(compare_relational(op, left, right)?)
        }
        Plus => PathValue::Number(left.to_number()? + right.to_number()?),
        Minus => PathValue::Number(left.to_number()? - right.to_number()?),
        Multiply => PathValue::Number(left.to_number()? * right.to_number()?),
        Divide => PathValue::Number(left.to_number()? / right.to_number()?),
        Modulo => PathValue::Number(left.to_number()? % right.to_number()?),
        Or => PathValue::Boolean(left.to_bool() || right.to_bool()),
        And => PathValue::Boolean(left.to_bool() && right.to_bool()),
        Union => {
            let mut nodes = nodes_of(left);
            nodes.extend(nodes_of(right));
            PathValue::Nodes(crate::context::sort_unique(nodes)?)
        }
    })
}

fn nodes_of(value: &PathValue) -> Vec<crate::pointer::PointerRef> {
    match value {
        PathValue::Nodes(nodes) => nodes.clone(),
        _ => Vec::new(),
    }
}

/// The comparable values of an operand: one per node for node lists.
fn atoms(value: &PathValue) -> Result<Vec<PathValue>> {
    match value {
        PathValue::Nodes(nodes) => nodes.iter().map(|n| Ok(atom(n.value()?))).collect(),
        PathValue::Object(v) => Ok(vec![atom(v.clone())]),
        other => Ok(vec![other.clone()]),
    }
}

fn atom(value: Value) -> PathValue {
    match value {
        Value::Null => PathValue::String(String::new()),
        Value::Cell(cell) => atom(cell.get()),
        other => PathValue::from_value(other),
    }
}

fn compare_equality(left: &PathValue, right: &PathValue, equal: bool) -> Result<bool> {
    if matches!(left, PathValue::Boolean(_)) || matches!(right, PathValue::Boolean(_)) {
        return Ok((left.to_bool() == right.to_bool()) == equal);
    }
    let (left, right) = (atoms(left)?, atoms(right)?);
    for a in &left {
        for b in &right {
            if atoms_equal(a, b)? == equal {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn atoms_equal(a: &PathValue, b: &PathValue) -> Result<bool> {
    Ok(match (a, b) {
        (PathValue::Boolean(_), _) | (_, PathValue::Boolean(_)) => a.to_bool() == b.to_bool(),
        (PathValue::Number(_), _) | (_, PathValue::Number(_)) => a.to_number()? == b.to_number()?,
        _ => a.to_string_value()? == b.to_string_value()?,
    })
}

fn compare_relational(op: BinaryOperator, left: &PathValue, right: &PathValue) -> Result<bool> {
    let (left, right) = (atoms(left)?, atoms(right)?);
    for a in &left {
        let x = a.to_number()?;
        for b in &right {
            let y = b.to_number()?;
            let holds = match op {
                BinaryOperator::LessThan => x < y,
                BinaryOperator::LessThanOrEqual => x <= y,
                BinaryOperator::GreaterThan => x > y,
                _ => x >= y,
            };
            if holds {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PathValue::from("1"), PathValue::Number(1.0), true)]
    #[case(PathValue::from("a"), PathValue::from("a"), true)]
    #[case(PathValue::from(""), PathValue::Boolean(false), true)]
    #[case(PathValue::Number(2.0), PathValue::Number(3.0), false)]
    #[case(PathValue::Number(f64::NAN), PathValue::Number(f64::NAN), false)]
    fn test_equality(#[case] left: PathValue, #[case] right: PathValue, #[case] expected: bool) {
        let result = evaluate(BinaryOperator::Equals, &left, &right).unwrap();
        assert!(matches!(result, PathValue::Boolean(b) if b == expected));
    }

    #[test]
    fn test_arithmetic() {
        let result = evaluate(
            BinaryOperator::Modulo,
            &PathValue::Number(-7.0),
            &PathValue::from("3"),
        )
        .unwrap();
        assert!(matches!(result, PathValue::Number(n) if n == -1.0));
    }

    #[test]
    fn test_empty_node_list_compares_false() {
        let empty = PathValue::Nodes(Vec::new());
        for op in [BinaryOperator::Equals, BinaryOperator::NotEquals, BinaryOperator::LessThan] {
            let result = evaluate(op, &empty, &PathValue::Number(1.0)).unwrap();
            assert!(matches!(result, PathValue::Boolean(false)));
        }
    }
}
