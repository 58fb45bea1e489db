//! # Filter Evaluation
//!
//! Every expression maps one input to a lazy stream of results. Outputs
//! are produced on demand, so everything emitted before an error is still
//! seen by the consumer; consumers stop at the first error. Binary
//! operators take the cartesian product of their operands' outputs, left
//! operand outermost.

use std::cmp::Ordering;
use std::iter;

use serde_json::{Map, Value};

use super::ast::{BinaryOp, Expr, ObjectKey};
use super::builtins;
use super::errors::{FilterError, FilterResult};
use super::value::{compare, number, truthy, type_name};

/// Outputs of an expression, in order
pub type ValueStream<'a> = Box<dyn Iterator<Item = FilterResult<Value>> + 'a>;

pub(super) fn stream<'a>(outputs: impl Iterator<Item = FilterResult<Value>> + 'a) -> ValueStream<'a> {
    Box::new(outputs)
}

pub(super) fn single<'a>(value: Value) -> ValueStream<'a> {
    stream(iter::once(Ok(value)))
}

pub(super) fn single_result<'a>(result: FilterResult<Value>) -> ValueStream<'a> {
    stream(iter::once(result))
}

/// One output computed only when pulled
pub(super) fn deferred<'a>(f: impl FnOnce() -> FilterResult<Value> + 'a) -> ValueStream<'a> {
    stream(iter::once_with(f))
}

pub(super) fn values<'a>(items: Vec<Value>) -> ValueStream<'a> {
    stream(items.into_iter().map(Ok))
}

/// Feed every output of `outputs` to `f`; errors pass through untouched
pub(super) fn then<'a, F>(outputs: ValueStream<'a>, f: F) -> ValueStream<'a>
where
    F: Fn(Value) -> ValueStream<'a> + 'a,
{
    stream(outputs.flat_map(move |item| match item {
        Ok(value) => f(value),
        Err(err) => single_result(Err(err)),
    }))
}

/// Evaluate `expr` against `input`
pub fn eval(expr: &Expr, input: Value) -> ValueStream<'_> {
    match expr {
        Expr::Identity => single(input),

        Expr::Literal(value) => single(value.clone()),

        Expr::Field { target, name } => {
            then(eval(target, input), move |value| single_result(field(&value, name)))
        }

        Expr::Index { target, index } => {
            let index_input = input.clone();
            then(eval(target, input), move |t| {
                then(eval(index, index_input.clone()), move |i| {
                    single_result(index_value(&t, &i))
                })
            })
        }

        Expr::Iterate { target } => then(eval(target, input), |value| match iterate(&value) {
            Ok(items) => values(items),
            Err(err) => single_result(Err(err)),
        }),

        // outputs before the first error survive; the error itself is dropped
        Expr::Try(inner) => stream(eval(inner, input).map_while(Result::ok).map(Ok)),

        Expr::Array(None) => single(Value::Array(Vec::new())),

        Expr::Array(Some(inner)) => deferred(move || eval_all(inner, input).map(Value::Array)),

        Expr::Object(entries) => construct_object(entries, input, Map::new()),

        Expr::Pipe(lhs, rhs) => then(eval(lhs, input), move |value| eval(rhs, value)),

        Expr::Comma(lhs, rhs) => {
            let rhs_input = input.clone();
            let rest = iter::once_with(move || eval(rhs, rhs_input)).flatten();
            stream(eval(lhs, input).chain(rest))
        }

        Expr::And(lhs, rhs) => {
            let rhs_input = input.clone();
            then(eval(lhs, input), move |l| {
                if !truthy(&l) {
                    return single(Value::Bool(false));
                }
                stream(eval(rhs, rhs_input.clone()).map(|r| r.map(|r| Value::Bool(truthy(&r)))))
            })
        }

        Expr::Or(lhs, rhs) => {
            let rhs_input = input.clone();
            then(eval(lhs, input), move |l| {
                if truthy(&l) {
                    return single(Value::Bool(true));
                }
                stream(eval(rhs, rhs_input.clone()).map(|r| r.map(|r| Value::Bool(truthy(&r)))))
            })
        }

        Expr::Neg(inner) => then(eval(inner, input), |value| single_result(negate(&value))),

        Expr::Binary { op, lhs, rhs } => {
            let op = *op;
            let rhs_input = input.clone();
            then(eval(lhs, input), move |l| {
                stream(
                    eval(rhs, rhs_input.clone())
                        .map(move |r| r.and_then(|r| binary(op, &l, &r))),
                )
            })
        }

        Expr::Call { name, args } => builtins::call(name, args, input),
    }
}

/// Evaluate `expr` to completion, failing on the first error
pub fn eval_all(expr: &Expr, input: Value) -> FilterResult<Vec<Value>> {
    eval(expr, input).collect()
}

fn negate(value: &Value) -> FilterResult<Value> {
    match value {
        Value::Number(n) => Ok(number(-n.as_f64().unwrap_or_default())),
        other => Err(FilterError::eval(format!(
            "{} ({}) cannot be negated",
            type_name(other),
            other
        ))),
    }
}

fn field(value: &Value, name: &str) -> FilterResult<Value> {
    match value {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Null => Ok(Value::Null),
        other => Err(FilterError::eval(format!(
            "Cannot index {} with \"{}\"",
            type_name(other),
            name
        ))),
    }
}

fn index_value(target: &Value, index: &Value) -> FilterResult<Value> {
    match (target, index) {
        (Value::Null, Value::String(_) | Value::Number(_)) => Ok(Value::Null),
        (Value::Object(_), Value::String(name)) => field(target, name),
        (Value::Array(items), Value::Number(n)) => {
            let n = n.as_f64().unwrap_or_default().floor() as i64;
            let len = items.len() as i64;
            let idx = if n < 0 { len + n } else { n };
            if idx < 0 || idx >= len {
                Ok(Value::Null)
            } else {
                Ok(items[idx as usize].clone())
            }
        }
        (t, i) => Err(FilterError::eval(format!(
            "Cannot index {} with {}",
            type_name(t),
            type_name(i)
        ))),
    }
}

/// Values of an array or object, in order
pub(super) fn iterate(value: &Value) -> FilterResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Object(map) => Ok(map.values().cloned().collect()),
        other => Err(FilterError::eval(format!(
            "Cannot iterate over {}",
            type_name(other)
        ))),
    }
}

/// Entries are expanded left to right, the first entry varying slowest
fn construct_object<'a>(
    entries: &'a [(ObjectKey, Expr)],
    input: Value,
    partial: Map<String, Value>,
) -> ValueStream<'a> {
    let Some(((key, value_expr), rest)) = entries.split_first() else {
        return single(Value::Object(partial));
    };

    let keys = match key {
        ObjectKey::Literal(name) => single(Value::String(name.clone())),
        ObjectKey::Computed(expr) => eval(expr, input.clone()),
    };

    then(keys, move |k| {
        let k = match k {
            Value::String(s) => s,
            other => {
                return single_result(Err(FilterError::eval(format!(
                    "Object keys must be strings, got {}",
                    type_name(&other)
                ))))
            }
        };
        let rest_input = input.clone();
        let partial = partial.clone();
        then(eval(value_expr, input.clone()), move |v| {
            let mut map = partial.clone();
            map.insert(k.clone(), v);
            construct_object(rest, rest_input.clone(), map)
        })
    })
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> FilterResult<Value> {
    let ord = || compare(l, r);
    match op {
        BinaryOp::Eq => Ok(Value::Bool(ord() == Ordering::Equal)),
        BinaryOp::Ne => Ok(Value::Bool(ord() != Ordering::Equal)),
        BinaryOp::Lt => Ok(Value::Bool(ord() == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(ord() != Ordering::Greater)),
        BinaryOp::Gt => Ok(Value::Bool(ord() == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(ord() != Ordering::Less)),
        BinaryOp::Add => add(l, r),
        BinaryOp::Sub => subtract(l, r),
        BinaryOp::Mul => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => Ok(number(a * b)),
            _ => Err(incompatible(op, l, r)),
        },
        BinaryOp::Div => match (l, r) {
            (Value::String(a), Value::String(b)) => Ok(Value::Array(
                a.split(b.as_str())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            )),
            _ => match (l.as_f64(), r.as_f64()) {
                (Some(_), Some(b)) if b == 0.0 => Err(FilterError::eval(format!(
                    "{} and {} cannot be divided because the divisor is zero",
                    l, r
                ))),
                (Some(a), Some(b)) => Ok(number(a / b)),
                _ => Err(incompatible(op, l, r)),
            },
        },
        BinaryOp::Mod => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => match (b as i64).checked_abs() {
                Some(0) => Err(FilterError::eval(format!(
                    "{} and {} cannot be divided because the divisor is zero",
                    l, r
                ))),
                Some(divisor) => Ok(number(((a as i64) % divisor) as f64)),
                None => Err(FilterError::eval(format!(
                    "{} and {} cannot be divided because the divisor is out of range",
                    l, r
                ))),
            },
            _ => Err(incompatible(op, l, r)),
        },
    }
}

fn add(l: &Value, r: &Value) -> FilterResult<Value> {
    match (l, r) {
        (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
        (Value::Number(a), Value::Number(b)) => Ok(number(
            a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default(),
        )),
        (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (Value::Array(a), Value::Array(b)) => {
            let mut joined = a.clone();
            joined.extend(b.iter().cloned());
            Ok(Value::Array(joined))
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut merged = a.clone();
            for (k, v) in b {
                merged.insert(k.clone(), v.clone());
            }
            Ok(Value::Object(merged))
        }
        _ => Err(incompatible(BinaryOp::Add, l, r)),
    }
}

fn subtract(l: &Value, r: &Value) -> FilterResult<Value> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(number(
            a.as_f64().unwrap_or_default() - b.as_f64().unwrap_or_default(),
        )),
        (Value::Array(a), Value::Array(b)) => Ok(Value::Array(
            a.iter()
                .filter(|item| !b.iter().any(|x| compare(item, x) == Ordering::Equal))
                .cloned()
                .collect(),
        )),
        _ => Err(incompatible(BinaryOp::Sub, l, r)),
    }
}

fn incompatible(op: BinaryOp, l: &Value, r: &Value) -> FilterError {
    let verb = match op {
        BinaryOp::Add => "added",
        BinaryOp::Sub => "subtracted",
        BinaryOp::Mul => "multiplied",
        BinaryOp::Div | BinaryOp::Mod => "divided",
        _ => "compared",
    };
    FilterError::eval(format!(
        "{} ({}) and {} ({}) cannot be {}",
        type_name(l),
        l,
        type_name(r),
        r,
        verb
    ))
}
