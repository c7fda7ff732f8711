//! Dot-delimited lookups into nested payloads.

use serde_json::Value;

use crate::models::Payload;

/// Resolve `path` (e.g. `metadata.document_name`) against a payload.
///
/// Every segment must name a key of a mapping. A missing key or a
/// non-mapping intermediate yields `None`. Segments are literal, so an empty
/// or whitespace path simply never matches.
pub fn resolve_path<'a>(payload: &'a Payload, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = payload.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// Like [`resolve_path`] but treats an explicit `null` as absent.
pub fn resolve_non_null<'a>(payload: &'a Payload, path: &str) -> Option<&'a Value> {
    resolve_path(payload, path).filter(|v| !v.is_null())
}

/// Truthiness of a JSON value: null, false, zero and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Short type name used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
