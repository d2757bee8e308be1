//! Tags: named annotations with an optional attribute set.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

/// A named annotation carrying optional attributes.
///
/// An attribute-free tag is a plain boolean flag. Tags compare equal to
/// their bare name (`tag == "has_code"`) for convenience lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: Map<String, Value>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Map::new(),
        }
    }

    /// Add an attribute (builder-style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_flag(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The annotation value this tag records: `true` for a flag, the
    /// attribute object otherwise.
    pub fn annotation_value(&self) -> Value {
        if self.is_flag() {
            Value::Bool(true)
        } else {
            Value::Object(self.attributes.clone())
        }
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

impl PartialEq<Tag> for &str {
    fn eq(&self, other: &Tag) -> bool {
        *self == other.name
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_flag() {
            return serializer.serialize_str(&self.name);
        }
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.attributes)?;
        map.end()
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_tag_equals_its_name() {
        let tag = Tag::new("working");
        assert_eq!(tag, "working");
        assert!("working" == tag);
        assert!(tag != "broken");
    }

    #[test]
    fn attributed_tag_serializes_nested() {
        let tag = Tag::new("has_code").with("blocks", 2).with("languages", json!(["rust"]));
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json, json!({"has_code": {"blocks": 2, "languages": ["rust"]}}));
    }

    #[test]
    fn flag_tag_serializes_as_name() {
        let json = serde_json::to_value(Tag::new("has_question")).unwrap();
        assert_eq!(json, json!("has_question"));
    }

    #[test]
    fn annotation_value_for_flag_and_attributes() {
        assert_eq!(Tag::new("x").annotation_value(), json!(true));
        assert_eq!(
            Tag::new("x").with("chars", 10).annotation_value(),
            json!({"chars": 10})
        );
    }
}
