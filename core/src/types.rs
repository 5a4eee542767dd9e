//! Request options and the shape of response payloads.

use serde_json::Value;

use crate::error::CacheError;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Forward the envelope's `data` to the object cache on success.
    pub cache: bool,
}

impl RequestOptions {
    pub fn cached() -> Self {
        Self { cache: true }
    }
}

/// A response envelope's `data`, classified for caching.
///
/// A JSON array is a collection of records; a JSON object carrying an `id`
/// is a single entity. Strings are never treated as collections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload<'a> {
    Collection(&'a [Value]),
    Entity { id: &'a Value, item: &'a Value },
}

impl<'a> Payload<'a> {
    /// Classify the `data` field of a decoded envelope.
    pub fn from_envelope(envelope: &'a Value) -> Result<Self, CacheError> {
        let data = envelope.get("data").ok_or(CacheError::MissingData)?;
        Self::classify(data)
    }

    pub fn classify(data: &'a Value) -> Result<Self, CacheError> {
        match data {
            Value::Array(items) => Ok(Payload::Collection(items)),
            Value::Object(fields) => match fields.get("id") {
                Some(id) if !id.is_null() => Ok(Payload::Entity { id, item: data }),
                _ => Err(CacheError::MissingId),
            },
            other => Err(CacheError::UnsupportedShape(json_type_name(other))),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
