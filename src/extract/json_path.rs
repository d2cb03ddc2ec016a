//! Dotted JSON path evaluation
//!
//! Supported syntax is a `.`-separated list of segments. A leading `$`
//! segment is ignored. Object segments are key lookups; array segments are
//! non-negative decimal indices (`$.images.0`). Filters, wildcards, slices
//! and bracket notation are not supported.

use super::ExtractError;
use serde_json::Value;

/// Walk `value` along `path` and return the terminal string.
pub fn evaluate<'v>(value: &'v Value, path: &str) -> Result<&'v str, ExtractError> {
    let mut current = value;

    for (position, segment) in path.split('.').enumerate() {
        if segment.is_empty() || (position == 0 && segment == "$") {
            continue;
        }
        current = step(current, segment)?;
    }

    current
        .as_str()
        .ok_or_else(|| ExtractError::NotAString(kind_of(current)))
}

fn step<'v>(current: &'v Value, segment: &str) -> Result<&'v Value, ExtractError> {
    match current {
        Value::Object(map) => map
            .get(segment)
            .ok_or_else(|| ExtractError::PathNotFound(segment.to_string())),
        Value::Array(items) => {
            let index: usize = segment
                .parse()
                .map_err(|_| ExtractError::InvalidIndex(segment.to_string()))?;
            items.get(index).ok_or(ExtractError::IndexOutOfBounds {
                index,
                len: items.len(),
            })
        }
        _ => Err(ExtractError::CannotTraverse(segment.to_string())),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
