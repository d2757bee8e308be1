//! Annotation maps and their helpers.
//!
//! An annotation value is a boolean, number, string, or a nested object
//! (a tag's attribute set). Keys are unique per entity and unordered.

use std::collections::HashMap;

use serde_json::Value;

/// Named facts attached to an exchange or conversation.
pub type Annotations = HashMap<String, Value>;

/// Build a single-entry annotation map.
pub fn create_annotation(name: impl Into<String>, value: impl Into<Value>) -> Annotations {
    let mut map = Annotations::with_capacity(1);
    map.insert(name.into(), value.into());
    map
}

/// Left-to-right union of annotation maps. On key collision the later map wins.
pub fn merge_annotations<'a, I>(maps: I) -> Annotations
where
    I: IntoIterator<Item = &'a Annotations>,
{
    let mut merged = Annotations::new();
    for map in maps {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Whether an annotation value counts as "set".
///
/// `false`, `null`, zero, and empty strings/objects read as unset.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
