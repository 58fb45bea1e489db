//! Builtin functions

use std::cmp::Ordering;

use serde_json::Value;

use super::ast::Expr;
use super::errors::{FilterError, FilterResult};
use super::eval::{
    deferred, eval, iterate, single, single_result, stream, then, ValueStream,
};
use super::value::{compare, number, truthy, type_name};

/// Name and arity of every builtin
const BUILTINS: &[(&str, usize)] = &[
    ("empty", 0),
    ("not", 0),
    ("length", 0),
    ("keys", 0),
    ("type", 0),
    ("tostring", 0),
    ("tonumber", 0),
    ("ascii_downcase", 0),
    ("ascii_upcase", 0),
    ("select", 1),
    ("map", 1),
    ("has", 1),
    ("contains", 1),
    ("startswith", 1),
    ("endswith", 1),
];

/// Arity of builtin `name`, `None` if undefined
pub fn arity(name: &str) -> Option<usize> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, arity)| *arity)
}

pub fn call<'a>(name: &str, args: &'a [Expr], input: Value) -> ValueStream<'a> {
    match (name, args) {
        ("empty", []) => stream(std::iter::empty::<FilterResult<Value>>()),
        ("not", []) => single(Value::Bool(!truthy(&input))),
        ("length", []) => single_result(length(&input)),
        ("keys", []) => single_result(keys(&input)),
        ("type", []) => single(Value::String(type_name(&input).to_string())),
        ("tostring", []) => single(match input {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }),
        ("tonumber", []) => single_result(tonumber(&input)),
        ("ascii_downcase", []) => single_result(with_string("ascii_downcase", &input, |s| {
            Value::String(s.to_ascii_lowercase())
        })),
        ("ascii_upcase", []) => single_result(with_string("ascii_upcase", &input, |s| {
            Value::String(s.to_ascii_uppercase())
        })),

        ("select", [cond]) => stream(eval(cond, input.clone()).filter_map(move |c| match c {
            Ok(c) if truthy(&c) => Some(Ok(input.clone())),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })),

        ("map", [f]) => deferred(move || {
            let mut mapped = Vec::new();
            for item in iterate(&input)? {
                for output in eval(f, item) {
                    mapped.push(output?);
                }
            }
            Ok(Value::Array(mapped))
        }),

        ("has", [key]) => then(eval(key, input.clone()), move |k| {
            single_result(has(&input, &k).map(Value::Bool))
        }),

        ("contains", [needle]) => then(eval(needle, input.clone()), move |n| {
            single_result(contains(&input, &n).map(Value::Bool))
        }),

        ("startswith", [prefix]) => then(eval(prefix, input.clone()), move |p| {
            single_result(match (&input, &p) {
                (Value::String(s), Value::String(p)) => Ok(Value::Bool(s.starts_with(p.as_str()))),
                _ => Err(FilterError::eval("startswith() requires string inputs")),
            })
        }),

        ("endswith", [suffix]) => then(eval(suffix, input.clone()), move |p| {
            single_result(match (&input, &p) {
                (Value::String(s), Value::String(p)) => Ok(Value::Bool(s.ends_with(p.as_str()))),
                _ => Err(FilterError::eval("endswith() requires string inputs")),
            })
        }),

        _ => single_result(Err(FilterError::eval(format!(
            "{}/{} is not defined",
            name,
            args.len()
        )))),
    }
}

fn with_string(name: &str, input: &Value, f: impl Fn(&str) -> Value) -> FilterResult<Value> {
    match input {
        Value::String(s) => Ok(f(s)),
        other => Err(FilterError::eval(format!(
            "{} input must be a string, got {}",
            name,
            type_name(other)
        ))),
    }
}

fn length(input: &Value) -> FilterResult<Value> {
    match input {
        Value::Null => Ok(number(0.0)),
        Value::Bool(_) => Err(FilterError::eval("boolean has no length")),
        Value::Number(n) => Ok(number(n.as_f64().unwrap_or_default().abs())),
        Value::String(s) => Ok(number(s.chars().count() as f64)),
        Value::Array(items) => Ok(number(items.len() as f64)),
        Value::Object(map) => Ok(number(map.len() as f64)),
    }
}

fn keys(input: &Value) -> FilterResult<Value> {
    match input {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Ok(Value::Array(
                keys.into_iter().map(|k| Value::String(k.clone())).collect(),
            ))
        }
        Value::Array(items) => Ok(Value::Array(
            (0..items.len()).map(|i| number(i as f64)).collect(),
        )),
        other => Err(FilterError::eval(format!(
            "{} has no keys",
            type_name(other)
        ))),
    }
}

fn tonumber(input: &Value) -> FilterResult<Value> {
    match input {
        Value::Number(_) => Ok(input.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(number)
            .map_err(|_| FilterError::eval(format!("Cannot parse '{}' as JSON", s))),
        other => Err(FilterError::eval(format!(
            "{} cannot be parsed as a number",
            type_name(other)
        ))),
    }
}

fn has(input: &Value, key: &Value) -> FilterResult<bool> {
    match (input, key) {
        (Value::Object(map), Value::String(k)) => Ok(map.contains_key(k)),
        (Value::Array(items), Value::Number(n)) => {
            let n = n.as_f64().unwrap_or_default();
            Ok(n >= 0.0 && (n as usize) < items.len())
        }
        (i, k) => Err(FilterError::eval(format!(
            "Cannot check whether {} has a {} key",
            type_name(i),
            type_name(k)
        ))),
    }
}

/// Recursive containment: substrings for strings, every needle element
/// contained in some haystack element for arrays, per-key containment for
/// objects, equality otherwise.
fn contains(haystack: &Value, needle: &Value) -> FilterResult<bool> {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => Ok(h.contains(n.as_str())),
        (Value::Array(h), Value::Array(n)) => {
            for wanted in n {
                let mut found = false;
                for item in h {
                    if contains(item, wanted)? {
                        found = true;
                        break;
                    }
                }
                if !found {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Object(h), Value::Object(n)) => {
            for (key, wanted) in n {
                match h.get(key) {
                    Some(item) if contains(item, wanted)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        (h, n) if type_name(h) == type_name(n) => Ok(compare(h, n) == Ordering::Equal),
        (h, n) => Err(FilterError::eval(format!(
            "{} ({}) and {} ({}) cannot have their containment checked",
            type_name(h),
            h,
            type_name(n),
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::eval::eval_all;
    use crate::search::parser::parse;
    use serde_json::json;

    fn run(filter: &str, input: Value) -> FilterResult<Vec<Value>> {
        eval_all(&parse(filter).unwrap(), input)
    }

    fn one(filter: &str, input: Value) -> Value {
        let mut out = run(filter, input).unwrap();
        assert_eq!(out.len(), 1, "{} produced {:?}", filter, out);
        out.remove(0)
    }

    #[test]
    fn test_arity_table() {
        assert_eq!(arity("select"), Some(1));
        assert_eq!(arity("length"), Some(0));
        assert_eq!(arity("nope"), None);
    }

    #[test]
    fn test_select() {
        assert_eq!(
            run("select(.v > 1)", json!({"v": 2})).unwrap(),
            vec![json!({"v": 2})]
        );
        assert!(run("select(.v > 1)", json!({"v": 0})).unwrap().is_empty());
    }

    #[test]
    fn test_map() {
        assert_eq!(one("map(. * 2)", json!([1, 2])), json!([2, 4]));
        assert_eq!(one("map(.a)", json!({"x": {"a": 1}})), json!([1]));
        assert!(run("map(.)", json!("s")).is_err());
    }

    #[test]
    fn test_length_and_keys() {
        assert_eq!(one("length", json!("héllo")), json!(5));
        assert_eq!(one("length", json!([1, 2, 3])), json!(3));
        assert_eq!(one("length", json!(null)), json!(0));
        assert_eq!(one("length", json!(-4)), json!(4));
        assert!(run("length", json!(true)).is_err());
        assert_eq!(one("keys", json!({"b": 1, "a": 2})), json!(["a", "b"]));
        assert_eq!(one("keys", json!(["x", "y"])), json!([0, 1]));
    }

    #[test]
    fn test_has() {
        assert_eq!(one("has(\"a\")", json!({"a": null})), json!(true));
        assert_eq!(one("has(\"b\")", json!({"a": 1})), json!(false));
        assert_eq!(one("has(1)", json!([0, 1])), json!(true));
        assert!(run("has(\"a\")", json!([1])).is_err());
    }

    #[test]
    fn test_contains() {
        assert_eq!(one("contains(\"ell\")", json!("hello")), json!(true));
        assert_eq!(
            one("contains([\"ba\"])", json!(["foobar", "x"])),
            json!(true)
        );
        assert_eq!(
            one("contains({a: [1]})", json!({"a": [1, 2], "b": 0})),
            json!(true)
        );
        assert_eq!(one("contains({c: 1})", json!({"a": 1})), json!(false));
        assert!(run("contains(1)", json!("1")).is_err());
    }

    #[test]
    fn test_string_builtins() {
        assert_eq!(one("startswith(\"ab\")", json!("abc")), json!(true));
        assert_eq!(one("endswith(\"bc\")", json!("abc")), json!(true));
        assert_eq!(one("ascii_upcase", json!("aB1")), json!("AB1"));
        assert_eq!(one("ascii_downcase", json!("aB1")), json!("ab1"));
        assert!(run("startswith(\"a\")", json!(1)).is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(one("tostring", json!({"a": 1})), json!("{\"a\":1}"));
        assert_eq!(one("tostring", json!("s")), json!("s"));
        assert_eq!(one("tonumber", json!("42")), json!(42));
        assert_eq!(one("tonumber", json!("1.5")), json!(1.5));
        assert!(run("tonumber", json!("abc")).is_err());
        assert_eq!(one("type", json!([])), json!("array"));
    }

    #[test]
    fn test_empty_and_not() {
        assert!(run("empty", json!(1)).unwrap().is_empty());
        assert_eq!(one("not", json!(null)), json!(true));
        assert_eq!(one(".a | not", json!({"a": 1})), json!(false));
    }
}
