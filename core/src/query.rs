//! URL query-string encoding for GET requests.
//!
//! Pairs are emitted in the mapping's own iteration order (`serde_json` is
//! built with `preserve_order`, so that is insertion order) and escaped the
//! way `encodeURIComponent` does: everything except ASCII alphanumerics and
//! `- _ . ! ~ * ' ( )` is percent-encoded as UTF-8.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode one key or value.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Build `k1=v1&k2=v2...` from `data`.
///
/// Objects contribute their own fields, arrays their indices. Any other
/// value has no pairs and yields an empty string.
pub fn construct_query_string(data: &Value) -> String {
    let pairs: Vec<String> = match data {
        Value::Object(fields) => fields.iter().map(|(k, v)| pair(k, v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| pair(&i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    };
    pairs.join("&")
}

fn pair(key: &str, value: &Value) -> String {
    format!("{}={}", encode_component(key), encode_component(&stringify(value)))
}

/// Text form of a query value: strings verbatim, arrays comma-joined with
/// `null` elements left empty, objects as compact JSON.
fn stringify(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed("null"),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Array(items) => Cow::Owned(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => Cow::Borrowed(""),
                    other => stringify(other),
                })
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Cow::Owned(value.to_string()),
    }
}
