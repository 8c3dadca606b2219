//! Typed accessors over Yahoo JSON
//!
//! Yahoo returns numbers either plain or as `{"raw": 1.5, "fmt": "1.50"}`.
//! Every accessor unwraps `raw` first and yields `None` for missing,
//! null, empty or non-finite values.

use serde_json::Value;
use yfdb_common::time;

/// `{raw, fmt}` objects unwrap to `raw`; anything else is returned as is
pub fn raw(value: &Value) -> &Value {
    match value.get("raw") {
        Some(inner) => inner,
        None => value,
    }
}

/// Finite number (numeric strings accepted)
pub fn num(value: &Value) -> Option<f64> {
    let parsed = match raw(value) {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Integer (integral floats accepted, fractional ones rejected)
pub fn int(value: &Value) -> Option<i64> {
    match raw(value) {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Non-empty string; numbers are rendered as text
pub fn text(value: &Value) -> Option<String> {
    match raw(value) {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Boolean stored as `"true"` / `"false"`
pub fn flag(value: &Value) -> Option<String> {
    match raw(value) {
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_ascii_lowercase()),
        _ => None,
    }
}

/// Epoch seconds as `YYYY-MM-DDTHH:MM:SS` (UTC); date strings are truncated
/// to the stored timestamp width
pub fn epoch_iso(value: &Value) -> Option<String> {
    match raw(value) {
        Value::String(s) if !s.trim().is_empty() => Some(time::truncate_timestamp(s.trim())),
        other => int(other).and_then(time::epoch_to_iso),
    }
}

/// Epoch seconds (or a date string) as the `YYYY-MM-DD` seen by an exchange
pub fn local_date(value: &Value, gmt_offset_secs: i32) -> Option<String> {
    match raw(value) {
        Value::String(s) => time::date_part(s),
        other => int(other).and_then(|epoch| time::epoch_to_local_date(epoch, gmt_offset_secs)),
    }
}

/// Compact JSON text for nested structures, `None` for null/empty
pub fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        other => serde_json::to_string(other).ok(),
    }
}

/// Items of an array value (empty for anything else)
pub fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}
