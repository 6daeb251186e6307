//! Lenient accessors over raw tool JSON. None of these panic on unexpected
//! shapes; missing or mistyped fields read as absent.

use serde_json::Value;

pub(crate) fn str_at<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub(crate) fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Positive line number from a number or numeric string.
pub(crate) fn line_at(value: &Value, key: &str) -> Option<u32> {
    let raw = value.get(key)?;
    let n = match raw {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}

pub(crate) fn u64_at(value: &Value, key: &str) -> Option<u64> {
    let raw = value.get(key)?;
    raw.as_u64()
        .or_else(|| raw.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
}

/// Scalar rendered as text (strings verbatim, numbers/bools formatted).
pub(crate) fn text_at(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn parse_json(text: &str) -> serde_json::Result<Value> {
    serde_json::from_str(text.trim())
}
