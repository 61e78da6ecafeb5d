//! option value coercion
//!
//! Option values arrive as JSON scalars, but CloudFormation passes mapping values and macro parameters
//! on as strings more often than not. Coercion rules per [OptionKind]:
//! - boolean: `true`/`false`, or the strings `"true"`/`"false"` (any case)
//! - integer: a non-negative integer that fits `u32`, or a string of digits
//! - string: a string; numbers and booleans are accepted and rendered as text
//!
//! Additionally:
//! - `null` means "not set", the option falls through to the layer below
//! - arrays and objects are never valid option values
//!
use crate::config::OptionKind;
use serde_json::Value;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct CoerceError {
    pub expected: OptionKind,
    pub found: String,
}

/// Coerce a raw value into the shape [crate::config::Configuration] deserializes
///
/// Returns `None` for `null`.
pub fn coerce(kind: OptionKind, value: &Value) -> Result<Option<Value>, CoerceError> {
    if value.is_null() {
        return Ok(None);
    }

    let coerced = match (kind, value) {
        (OptionKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (OptionKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        (OptionKind::Integer, Value::Number(n)) => n.as_u64().and_then(integer),
        (OptionKind::Integer, Value::String(s)) => s.trim().parse::<u64>().ok().and_then(integer),
        (OptionKind::String, Value::String(_)) => Some(value.clone()),
        (OptionKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (OptionKind::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
        _ => None,
    };

    coerced.map(Some).ok_or_else(|| CoerceError {
        expected: kind,
        found: describe(value),
    })
}

fn integer(n: u64) -> Option<Value> {
    u32::try_from(n).ok().map(Value::from)
}

/// Short human readable description of a value for error messages
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "a list".to_string(),
        Value::Object(_) => "a mapping".to_string(),
    }
}

/// Render a boolean the way CloudFormation environment variables carry it
pub fn flag(value: bool) -> Value {
    Value::String(value.to_string())
}
