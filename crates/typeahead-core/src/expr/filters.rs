//! Built-in pipe filters: `filter`, `limitTo`, `lowercase`, `uppercase`.

use serde_json::Value;

use super::eval::{to_display, to_number};
use super::scope::Scope;
use crate::error::{Result, TypeaheadError};

/// Apply the named filter, preferring scope-registered filters.
pub fn apply(scope: &Scope, name: &str, input: &Value, args: &[Value]) -> Result<Value> {
    if let Some(custom) = scope.filter(name) {
        return custom(input, args);
    }

    match name {
        "filter" => Ok(filter(input, args.first().unwrap_or(&Value::Null))),
        "limitTo" => Ok(limit_to(input, args.first().unwrap_or(&Value::Null))),
        "lowercase" => Ok(map_string(input, str::to_lowercase)),
        "uppercase" => Ok(map_string(input, str::to_uppercase)),
        _ => Err(TypeaheadError::UnknownFilter(name.to_string())),
    }
}

/// Keep array items matching `pattern`. A primitive pattern matches
/// case-insensitive substrings anywhere in the item; an object pattern
/// requires every listed property to match.
fn filter(input: &Value, pattern: &Value) -> Value {
    let Value::Array(items) = input else {
        return input.clone();
    };

    let kept = items
        .iter()
        .filter(|item| match pattern {
            Value::Null => true,
            Value::Object(fields) => fields.iter().all(|(key, expected)| {
                let actual = item.get(key).unwrap_or(&Value::Null);
                contains_text(actual, &to_display(expected).to_lowercase())
            }),
            other => contains_text(item, &to_display(other).to_lowercase()),
        })
        .cloned()
        .collect();

    Value::Array(kept)
}

fn contains_text(value: &Value, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    match value {
        Value::Null => false,
        Value::Object(fields) => fields.values().any(|v| contains_text(v, needle)),
        Value::Array(items) => items.iter().any(|v| contains_text(v, needle)),
        other => to_display(other).to_lowercase().contains(needle),
    }
}

fn limit_to(input: &Value, limit: &Value) -> Value {
    let limit = to_number(limit);
    if limit.is_nan() {
        return input.clone();
    }
    let limit = limit.trunc() as i64;

    let take = |len: usize| -> (usize, usize) {
        let n = limit.unsigned_abs().min(len as u64) as usize;
        if limit >= 0 { (0, n) } else { (len - n, len) }
    };

    match input {
        Value::Array(items) => {
            let (start, end) = take(items.len());
            Value::Array(items[start..end].to_vec())
        }
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = take(chars.len());
            Value::String(chars[start..end].iter().collect())
        }
        other => other.clone(),
    }
}

fn map_string(input: &Value, f: fn(&str) -> String) -> Value {
    match input {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}
