//! Field readers for loosely-typed JSON payloads.
//!
//! Every reader takes the enclosing object and a field name so that a
//! failure can name the offending field. Absent and `null` are treated the
//! same for optional fields.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

use crate::error::DecodingError;

pub(crate) type Object = Map<String, Value>;

/// Wire format for every timestamp this crate emits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Object, DecodingError> {
    value
        .as_object()
        .ok_or_else(|| DecodingError::invalid_type(field, "object"))
}

fn present<'a>(obj: &'a Object, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

pub(crate) fn required_str(obj: &Object, field: &str) -> Result<String, DecodingError> {
    match present(obj, field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodingError::invalid_type(field, "string")),
        None => Err(DecodingError::missing(field)),
    }
}

/// Identifiers arrive as strings or integers depending on the API version;
/// both are normalized to strings.
pub(crate) fn required_id(obj: &Object, field: &str) -> Result<String, DecodingError> {
    match present(obj, field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Some(_) => Err(DecodingError::invalid_type(field, "string or integer")),
        None => Err(DecodingError::missing(field)),
    }
}

pub(crate) fn optional_str(obj: &Object, field: &str) -> Result<Option<String>, DecodingError> {
    match present(obj, field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DecodingError::invalid_type(field, "string")),
        None => Ok(None),
    }
}

pub(crate) fn optional_bool(obj: &Object, field: &str) -> Result<Option<bool>, DecodingError> {
    match present(obj, field) {
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(DecodingError::invalid_type(field, "boolean")),
        None => Ok(None),
    }
}

pub(crate) fn optional_u64(obj: &Object, field: &str) -> Result<Option<u64>, DecodingError> {
    match present(obj, field) {
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| DecodingError::invalid_type(field, "non-negative integer")),
        None => Ok(None),
    }
}

pub(crate) fn optional_object(obj: &Object, field: &str) -> Result<Option<Object>, DecodingError> {
    match present(obj, field) {
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(DecodingError::invalid_type(field, "object")),
        None => Ok(None),
    }
}

/// Absent or `null` lists decode as empty.
pub(crate) fn string_list(obj: &Object, field: &str) -> Result<Vec<String>, DecodingError> {
    let Some(value) = present(obj, field) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| DecodingError::invalid_type(field, "array of strings"))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| DecodingError::invalid_type(field, "array of strings"))
        })
        .collect()
}

/// Decode each element of an optional array; a failing element is reported
/// against `field`.
pub(crate) fn entity_list<T>(
    obj: &Object,
    field: &str,
    decode: fn(&Value) -> Result<T, DecodingError>,
) -> Result<Vec<T>, DecodingError> {
    let Some(value) = present(obj, field) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| DecodingError::invalid_type(field, "array"))?;
    items
        .iter()
        .map(|item| decode(item).map_err(|e| DecodingError::nested(field, e)))
        .collect()
}

pub(crate) fn optional_timestamp(
    obj: &Object,
    field: &str,
) -> Result<Option<NaiveDateTime>, DecodingError> {
    match present(obj, field) {
        Some(Value::String(s)) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| DecodingError::invalid_value(field, format!("unrecognized timestamp `{s}`"))),
        Some(_) => Err(DecodingError::invalid_type(field, "timestamp string")),
        None => Ok(None),
    }
}

/// Accepts the fixed `YYYY-MM-DD HH:MM:SS` form and RFC 3339. RFC 3339
/// values are converted to UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn put_opt_str(obj: &mut Object, field: &str, value: &Option<String>) {
    if let Some(v) = value {
        obj.insert(field.to_string(), Value::String(v.clone()));
    }
}

pub(crate) fn put_opt_timestamp(obj: &mut Object, field: &str, value: &Option<NaiveDateTime>) {
    if let Some(ts) = value {
        obj.insert(field.to_string(), Value::String(format_timestamp(ts)));
    }
}

/// Implements serde traits for a DTO by routing through its
/// `from_payload`/`to_payload` pair, so both paths share one set of rules.
macro_rules! payload_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serde::Serialize::serialize(&self.to_payload(), serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                <$ty>::from_payload(&value).map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use payload_serde;
