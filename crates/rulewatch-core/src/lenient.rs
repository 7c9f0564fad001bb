//! Tolerant field decoders for backend payloads.
//!
//! The reasoning backend is loosely typed: counters arrive as strings or
//! floats, text fields arrive as `null`, and lists are sometimes missing or
//! not lists at all. These decoders read the field as a [`Value`], coerce
//! what they can, and fall back to the field's default otherwise, so a record
//! decodes from any JSON object.
//!
//! Use with `#[serde(default, deserialize_with = "crate::lenient::...")]`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Any scalar as text. `null` is empty; numbers and booleans are formatted;
/// arrays and objects keep their JSON text.
pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text(Value::deserialize(deserializer)?))
}

/// Like [`string`], but `null` is `None`.
pub(crate) fn opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => Some(text(other)),
    })
}

/// A finite number, or a numeric string such as `"85"` or `"85%"`.
pub(crate) fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?).unwrap_or_default())
}

/// A non-negative count. Fractions are rounded; out-of-range values saturate.
pub(crate) fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?).map_or(0, |n| n.round() as u32))
}

/// A percentage in `u8`. Fractions are rounded; out-of-range values saturate.
pub(crate) fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(number(&Value::deserialize(deserializer)?).map_or(0, |n| n.round() as u8))
}

/// `true`, `"true"`/`"yes"`, or a non-zero number.
pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

/// A list of records. A non-list is empty; elements that do not decode are
/// skipped.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// An optional nested record. `null` or an undecodable value is `None`.
pub(crate) fn record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        other => T::deserialize(other).ok(),
    })
}

fn text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
