//! JSON reshaping helpers shared by the chains

use crate::Result;
use serde::Serialize;
use serde_json::{Map, Value};

/// Record returned by a Cypher query: column name to value
pub type Record = Map<String, Value>;

/// Recursively drop every object entry whose key is in `keys`.
///
/// Used to strip embedding vectors out of query results before they are
/// shown to a model or a user.
pub fn remove_keys(value: Value, keys: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !keys.contains(&key.as_str()))
                .map(|(key, value)| (key, remove_keys(value, keys)))
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|item| remove_keys(item, keys)).collect())
        }
        other => other,
    }
}

/// Pretty-print with a one-space indent, keeping key insertion order.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever writes UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
