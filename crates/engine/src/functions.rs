//! The core function library and dispatch to extension functions.

use crate::env::EvalState;
use crate::error::{PathError, Result};
use crate::eval;
use crate::pointer::{PointerExt, PointerRef};
use crate::value::{PathValue, value_to_number, value_to_string};
use objpath_compiler::Expression;
use objpath_types::QName;
use std::ops::RangeInclusive;

const CORE_FUNCTIONS: &[&str] = &[
    "last",
    "position",
    "count",
    "local-name",
    "namespace-uri",
    "name",
    "string",
    "concat",
    "starts-with",
    "ends-with",
    "contains",
    "substring-before",
    "substring-after",
    "substring",
    "string-length",
    "normalize-space",
    "translate",
    "boolean",
    "not",
    "true",
    "false",
    "lang",
    "number",
    "sum",
    "floor",
    "ceiling",
    "round",
];

pub fn is_core_function(name: &str) -> bool {
    CORE_FUNCTIONS.contains(&name)
}

/// Evaluates the arguments and calls the named function.
///
/// Unprefixed core names resolve to the core library; everything else goes to
/// the extension functions of the environment chain.
pub fn call(name: &QName, args: &[Expression], state: &EvalState) -> Result<PathValue> {
    let values = args
        .iter()
        .map(|arg| eval::evaluate(arg, state))
        .collect::<Result<Vec<_>>>()?;
    if name.prefix().is_none() && is_core_function(name.name()) {
        return core(name.name(), values, state);
    }
    match state.env.function(name, values.len()) {
        Some(function) => function.invoke(state, &values),
        None => Err(PathError::FunctionNotFound {
            name: name.to_string(),
        }),
    }
}

fn check_arity(name: &str, args: &[PathValue], expected: RangeInclusive<usize>) -> Result<()> {
    if expected.contains(&args.len()) {
        return Ok(());
    }
    let message = if expected.start() == expected.end() {
        format!("Expected {} argument(s), got {}", expected.start(), args.len())
    } else {
        format!(
            "Expected {} to {} arguments, got {}",
            expected.start(),
            expected.end(),
            args.len()
        )
    };
    Err(PathError::function(&format!("{}()", name), message))
}

fn core(name: &str, mut args: Vec<PathValue>, state: &EvalState) -> Result<PathValue> {
    match name {
        // Node-set
        "last" => {
            check_arity(name, &args, 0..=0)?;
            Ok(PathValue::Number(state.size as f64))
        }
        "position" => {
            check_arity(name, &args, 0..=0)?;
            Ok(PathValue::Number(state.position as f64))
        }
        "count" => {
            check_arity(name, &args, 1..=1)?;
            match args.remove(0) {
                PathValue::Nodes(nodes) => Ok(PathValue::Number(nodes.len() as f64)),
                other => Err(PathError::function(
                    "count()",
                    format!("argument must be a node-set, got {:?}", other),
                )),
            }
        }
        "local-name" | "name" | "namespace-uri" => {
            check_arity(name, &args, 0..=1)?;
            let node = subject_node(name, args.pop(), state)?;
            let text = match (name, node) {
                (_, None) => String::new(),
                ("namespace-uri", Some(node)) => node.node_namespace_uri().unwrap_or_default(),
                ("name", Some(node)) => node.name().map(|n| n.to_string()).unwrap_or_default(),
                (_, Some(node)) => node.name().map(|n| n.name().to_string()).unwrap_or_default(),
            };
            Ok(PathValue::String(text))
        }

        // String
        "string" => {
            check_arity(name, &args, 0..=1)?;
            Ok(PathValue::String(string_arg(args.pop(), state)?))
        }
        "concat" => {
            if args.len() < 2 {
                return Err(PathError::function(
                    "concat()",
                    "Expected at least 2 arguments",
                ));
            }
            let mut out = String::new();
            for arg in &args {
                out.push_str(&arg.to_string_value()?);
            }
            Ok(PathValue::String(out))
        }
        "starts-with" | "ends-with" | "contains" => {
            check_arity(name, &args, 2..=2)?;
            let needle = args.remove(1).to_string_value()?;
            let haystack = args.remove(0).to_string_value()?;
            Ok(PathValue::Boolean(match name {
                "starts-with" => haystack.starts_with(&needle),
                "ends-with" => haystack.ends_with(&needle),
                _ => haystack.contains(&needle),
            }))
        }
        "substring-before" | "substring-after" => {
            check_arity(name, &args, 2..=2)?;
            let needle = args.remove(1).to_string_value()?;
            let haystack = args.remove(0).to_string_value()?;
            let result = match haystack.find(&needle) {
                Some(i) if name == "substring-before" => haystack[..i].to_string(),
                Some(i) => haystack[i + needle.len()..].to_string(),
                None => String::new(),
            };
            Ok(PathValue::String(result))
        }
        "substring" => {
            check_arity(name, &args, 2..=3)?;
            let length = if args.len() == 3 {
                Some(args.remove(2).to_number()?)
            } else {
                None
            };
            let start = args.remove(1).to_number()?;
            let s = args.remove(0).to_string_value()?;
            Ok(PathValue::String(substring(&s, start, length)))
        }
        "string-length" => {
            check_arity(name, &args, 0..=1)?;
            let s = string_arg(args.pop(), state)?;
            Ok(PathValue::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            check_arity(name, &args, 0..=1)?;
            let s = string_arg(args.pop(), state)?;
            Ok(PathValue::String(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        }
        "translate" => {
            check_arity(name, &args, 3..=3)?;
            let to: Vec<char> = args.remove(2).to_string_value()?.chars().collect();
            let from: Vec<char> = args.remove(1).to_string_value()?.chars().collect();
            let source = args.remove(0).to_string_value()?;
            let result = source
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(pos) => to.get(pos).copied(),
                    None => Some(c),
                })
                .collect();
            Ok(PathValue::String(result))
        }

        // Boolean
        "boolean" => {
            check_arity(name, &args, 1..=1)?;
            Ok(PathValue::Boolean(args.remove(0).to_bool()))
        }
        "not" => {
            check_arity(name, &args, 1..=1)?;
            Ok(PathValue::Boolean(!args.remove(0).to_bool()))
        }
        "true" | "false" => {
            check_arity(name, &args, 0..=0)?;
            Ok(PathValue::Boolean(name == "true"))
        }
        "lang" => {
            check_arity(name, &args, 1..=1)?;
            let lang = args.remove(0).to_string_value()?;
            Ok(PathValue::Boolean(state.node.is_language(&lang)))
        }

        // Number
        "number" => {
            check_arity(name, &args, 0..=1)?;
            let n = match args.pop() {
                Some(arg) => arg.to_number()?,
                None => value_to_number(&state.node.value()?),
            };
            Ok(PathValue::Number(n))
        }
        "sum" => {
            check_arity(name, &args, 1..=1)?;
            match args.remove(0) {
                PathValue::Nodes(nodes) => {
                    let mut sum = 0.0;
                    for node in &nodes {
                        sum += value_to_number(&node.value()?);
                    }
                    Ok(PathValue::Number(sum))
                }
                other => Err(PathError::function(
                    "sum()",
                    format!("argument must be a node-set, got {:?}", other),
                )),
            }
        }
        "floor" => {
            check_arity(name, &args, 1..=1)?;
            Ok(PathValue::Number(args.remove(0).to_number()?.floor()))
        }
        "ceiling" => {
            check_arity(name, &args, 1..=1)?;
            Ok(PathValue::Number(args.remove(0).to_number()?.ceil()))
        }
        "round" => {
            check_arity(name, &args, 1..=1)?;
            let n = args.remove(0).to_number()?;
            if n.is_nan() || n.is_infinite() || n == 0.0 {
                return Ok(PathValue::Number(n));
            }
            // Halves round towards positive infinity.
            Ok(PathValue::Number((n + 0.5).floor()))
        }
        _ => Err(PathError::FunctionNotFound {
            name: name.to_string(),
        }),
    }
}

/// The node a name function reports on: the first node of the argument, or the context node.
fn subject_node(name: &str, arg: Option<PathValue>, state: &EvalState) -> Result<Option<PointerRef>> {
    match arg {
        None => Ok(Some(state.node.clone())),
        Some(PathValue::Nodes(nodes)) => Ok(nodes.into_iter().next()),
        Some(other) => Err(PathError::function(
            &format!("{}()", name),
            format!("argument must be a node-set, got {:?}", other),
        )),
    }
}

fn string_arg(arg: Option<PathValue>, state: &EvalState) -> Result<String> {
    match arg {
        Some(arg) => arg.to_string_value(),
        None => Ok(value_to_string(&state.node.value()?)),
    }
}

fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = (start + 0.5).floor();
    let last = length.map_or(f64::INFINITY, |l| first + (l + 0.5).floor());
    s.chars()
        .enumerate()
        .filter(|(i, _)| {
            let pos = (i + 1) as f64;
            pos >= first && pos < last
        })
        .map(|(_, c)| c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_rounding() {
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", 2.0, None), "2345");
    }

    #[test]
    fn test_core_names() {
        assert!(is_core_function("ends-with"));
        assert!(!is_core_function("format-number"));
    }
}
