//! Tree-walking evaluator with JavaScript-flavoured value semantics.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::filters;
use super::parser::{BinaryOp, Expr, UnaryOp};
use super::scope::{Completion, Locals, Scope};
use crate::error::{Result, TypeaheadError};

/// Evaluation environment: locals shadow scope values.
pub struct Env<'a> {
    pub scope: &'a Scope,
    pub locals: &'a Locals,
    /// Source text of the expression being evaluated, for error messages.
    pub source: &'a str,
}

impl Env<'_> {
    fn lookup(&self, name: &str) -> Value {
        self.locals
            .get(name)
            .or_else(|| self.scope.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

/// Evaluate allowing the root node to produce a deferred value.
pub fn evaluate_root(expr: &Expr, env: &Env<'_>) -> Result<Completion> {
    match expr {
        Expr::Call(name, args) => call(name, args, env),
        other => evaluate(other, env).map(Completion::Ready),
    }
}

pub fn evaluate(expr: &Expr, env: &Env<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => Ok(env.lookup(name)),
        Expr::Member(base, name) => Ok(member(&evaluate(base, env)?, name)),
        Expr::Index(base, index) => {
            let base = evaluate(base, env)?;
            let index = evaluate(index, env)?;
            Ok(index_value(&base, &index))
        }
        Expr::Call(name, args) => match call(name, args, env)? {
            Completion::Ready(value) => Ok(value),
            Completion::Deferred(_) => Err(TypeaheadError::UnexpectedDeferred(env.source.to_string())),
        },
        Expr::Unary(op, operand) => {
            let value = evaluate(operand, env)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!truthy(&value)),
                UnaryOp::Neg => number(-to_number(&value)),
                UnaryOp::Plus => number(to_number(&value)),
            })
        }
        Expr::Binary(BinaryOp::And, lhs, rhs) => {
            let left = evaluate(lhs, env)?;
            if truthy(&left) { evaluate(rhs, env) } else { Ok(left) }
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs) => {
            let left = evaluate(lhs, env)?;
            if truthy(&left) { Ok(left) } else { evaluate(rhs, env) }
        }
        Expr::Binary(op, lhs, rhs) => {
            let left = evaluate(lhs, env)?;
            let right = evaluate(rhs, env)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Ternary(test, then, otherwise) => {
            if truthy(&evaluate(test, env)?) {
                evaluate(then, env)
            } else {
                evaluate(otherwise, env)
            }
        }
        Expr::Array(items) => items
            .iter()
            .map(|item| evaluate(item, env))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Expr::Object(entries) => {
            let mut object = Map::new();
            for (key, value) in entries {
                object.insert(key.clone(), evaluate(value, env)?);
            }
            Ok(Value::Object(object))
        }
        Expr::Filter { input, name, args } => {
            let input = evaluate(input, env)?;
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<Result<Vec<_>>>()?;
            filters::apply(env.scope, name, &input, &args)
        }
    }
}

fn call(name: &str, args: &[Expr], env: &Env<'_>) -> Result<Completion> {
    let function = env
        .scope
        .function(name)
        .ok_or_else(|| TypeaheadError::UnknownFunction(name.to_string()))?;
    let args = args
        .iter()
        .map(|arg| evaluate(arg, env))
        .collect::<Result<Vec<_>>>()?;
    function(&args)
}

/// Write `value` through an assignable expression, creating missing
/// intermediate objects on the way.
pub fn assign(expr: &Expr, scope: &mut Scope, value: Value, source: &str) -> Result<()> {
    let mut path = Vec::new();
    let root = collect_path(expr, scope, &mut path, source)?;
    path.reverse();

    if path.is_empty() {
        scope.set(root, value);
        return Ok(());
    }

    let mut slot = scope
        .values_mut()
        .entry(root)
        .or_insert_with(|| Value::Object(Map::new()));
    let (last, parents) = path.split_last().ok_or_else(|| TypeaheadError::NotAssignable(source.to_string()))?;
    for key in parents {
        slot = child_slot(slot, key, source)?;
    }
    match last {
        PathKey::Position(i) if slot.is_array() => {
            if let Value::Array(items) = slot {
                if *i >= items.len() {
                    items.resize(*i + 1, Value::Null);
                }
                items[*i] = value;
            }
        }
        key => {
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(object) = slot {
                object.insert(key.as_key(), value);
            }
        }
    }
    Ok(())
}

enum PathKey {
    Name(String),
    Position(usize),
}

impl PathKey {
    fn as_key(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Position(i) => i.to_string(),
        }
    }
}

/// Walks member/index nodes outward-in; returns the root identifier and
/// pushes keys innermost-last.
fn collect_path(expr: &Expr, scope: &Scope, path: &mut Vec<PathKey>, source: &str) -> Result<String> {
    match expr {
        Expr::Ident(name) => Ok(name.clone()),
        Expr::Member(base, name) => {
            path.push(PathKey::Name(name.clone()));
            collect_path(base, scope, path, source)
        }
        Expr::Index(base, index) => {
            let locals = Locals::new();
            let env = Env { scope, locals: &locals, source };
            let key = match evaluate(index, &env)? {
                Value::Number(n) => match n.as_u64() {
                    Some(i) => PathKey::Position(i as usize),
                    None => PathKey::Name(n.to_string()),
                },
                other => PathKey::Name(to_display(&other)),
            };
            path.push(key);
            collect_path(base, scope, path, source)
        }
        _ => Err(TypeaheadError::NotAssignable(source.to_string())),
    }
}

fn child_slot<'v>(slot: &'v mut Value, key: &PathKey, source: &str) -> Result<&'v mut Value> {
    if let PathKey::Position(i) = key {
        if slot.is_array() {
            return slot
                .get_mut(*i)
                .ok_or_else(|| TypeaheadError::NotAssignable(source.to_string()));
        }
    }
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(object) => Ok(object
            .entry(key.as_key())
            .or_insert_with(|| Value::Object(Map::new()))),
        _ => Err(TypeaheadError::NotAssignable(source.to_string())),
    }
}

pub fn is_assignable(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) => true,
        Expr::Member(base, _) | Expr::Index(base, _) => is_assignable(base),
        _ => false,
    }
}

// ─── Value semantics ───────────────────────────────────────

fn member(base: &Value, name: &str) -> Value {
    match base {
        Value::Object(object) => object.get(name).cloned().unwrap_or(Value::Null),
        Value::Array(items) if name == "length" => Value::from(items.len()),
        Value::String(s) if name == "length" => Value::from(s.chars().count()),
        _ => Value::Null,
    }
}

fn index_value(base: &Value, index: &Value) -> Value {
    match (base, index) {
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        (Value::String(s), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| s.chars().nth(i as usize))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        (base, index) => member(base, &to_display(index)),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if left.is_string() || right.is_string() {
                Value::String(format!("{}{}", to_display(left), to_display(right)))
            } else {
                number(to_number(left) + to_number(right))
            }
        }
        BinaryOp::Sub => number(to_number(left) - to_number(right)),
        BinaryOp::Mul => number(to_number(left) * to_number(right)),
        BinaryOp::Div => number(to_number(left) / to_number(right)),
        BinaryOp::Rem => number(to_number(left) % to_number(right)),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(compare(left, right), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Ge => Value::Bool(matches!(compare(left, right), Some(Ordering::Greater | Ordering::Equal))),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::Ne => Value::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(left, right)),
        BinaryOp::StrictNe => Value::Bool(!strict_eq(left, right)),
        // Short-circuiting forms are handled in `evaluate`.
        BinaryOp::And | BinaryOp::Or => Value::Null,
    }
}

/// JavaScript truthiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Integral results stay integers so `1 + 1` compares equal to `2`.
pub fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Text rendering used for labels and string concatenation.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), _)
        | (_, Value::Bool(_))
            if !left.is_null() && !right.is_null() =>
        {
            to_number(left) == to_number(right)
        }
        _ => strict_eq(left, right),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(left).partial_cmp(&to_number(right)),
    }
}
