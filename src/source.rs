//! Untyped build input
//!
//! A [`Source`] is either a key-value mapping or the attributes of an arbitrary
//! object. Both are carried as a `serde_json::Value` so every schema reads them
//! the same way; extra keys and attributes are ignored unless a schema denies them.

use serde::Serialize;
use serde_json::{Map, Value};

/// How the source was supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Keyword-style population from a mapping
    Mapping,
    /// Attributes read from an object
    Object,
}

/// Input to `SchemaRegistry::build`
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    kind: SourceKind,
    value: Value,
}

impl Source {
    /// Source from a key-value mapping
    pub fn mapping(map: Map<String, Value>) -> Self {
        Self {
            kind: SourceKind::Mapping,
            value: Value::Object(map),
        }
    }

    /// Source from an object's attributes
    ///
    /// An object that cannot be serialized exposes no attributes and matches no schema.
    pub fn object<T: Serialize + ?Sized>(object: &T) -> Self {
        let value = match serde_json::to_value(object) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "object source exposes no attributes");
                Value::Null
            }
        };
        Self {
            kind: SourceKind::Object,
            value,
        }
    }

    /// Source from a raw JSON value: objects are mappings, anything else is an object source
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::mapping(map),
            other => Self {
                kind: SourceKind::Object,
                value: other,
            },
        }
    }

    /// Get how this source was supplied
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Get the underlying value
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl From<Map<String, Value>> for Source {
    fn from(map: Map<String, Value>) -> Self {
        Self::mapping(map)
    }
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct OldInput {
        value: String,
    }

    #[test]
    fn test_mapping_and_object_agree() {
        let Value::Object(map) = json!({"value": "123"}) else {
            unreachable!()
        };
        let mapping = Source::mapping(map);
        let object = Source::object(&OldInput {
            value: "123".to_string(),
        });

        assert_eq!(mapping.kind(), SourceKind::Mapping);
        assert_eq!(object.kind(), SourceKind::Object);
        assert_eq!(mapping.value(), object.value());
    }

    #[test]
    fn test_from_value_kinds() {
        assert_eq!(Source::from_value(json!({})).kind(), SourceKind::Mapping);
        assert_eq!(Source::from_value(json!(42)).kind(), SourceKind::Object);
    }
}
