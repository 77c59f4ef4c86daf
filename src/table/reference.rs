//! Binary body references embedded in table JSON headers.
//!
//! A reference is a JSON object of the form
//! `{"byteOffset": 0, "componentType": "FLOAT", "type": "VEC3"}` pointing
//! into the binary body that follows the JSON header.

use serde_json::{Map, Value};

use super::{ComponentType, ContainerType};

pub const BYTE_OFFSET: &str = "byteOffset";
pub const COMPONENT_TYPE: &str = "componentType";
pub const CONTAINER_TYPE: &str = "type";

/// Location and declared layout of a property inside a binary body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BinaryBodyReference {
    /// Offset from the start of the binary body.
    pub byte_offset: u32,
    /// Declared component type, if present.
    pub component_type: Option<ComponentType>,
    /// Declared container type, if present.
    pub container_type: Option<ContainerType>,
}

/// Result of classifying a JSON header value.
#[derive(Clone, Debug, PartialEq)]
pub enum ReferenceShape {
    /// Plain literal.
    NotReference,
    /// Well-formed reference.
    Reference(BinaryBodyReference),
    /// Looks like a reference but uses a type token or offset this codec
    /// cannot interpret.
    Unsupported(String),
}

impl BinaryBodyReference {
    pub const fn new(
        byte_offset: u32,
        component_type: Option<ComponentType>,
        container_type: Option<ContainerType>,
    ) -> Self {
        Self { byte_offset, component_type, container_type }
    }

    /// Classify a JSON value: any object carrying a `byteOffset` is a reference.
    pub fn parse(value: &Value) -> ReferenceShape {
        let Some(obj) = value.as_object() else {
            return ReferenceShape::NotReference;
        };
        let Some(offset) = obj.get(BYTE_OFFSET) else {
            return ReferenceShape::NotReference;
        };
        let Some(byte_offset) = offset.as_u64().and_then(|o| u32::try_from(o).ok()) else {
            return ReferenceShape::Unsupported(format!("byteOffset {offset} is not a 32-bit unsigned integer"));
        };

        let component_type = match obj.get(COMPONENT_TYPE) {
            None => None,
            Some(token) => match token.as_str().and_then(ComponentType::from_name) {
                Some(c) => Some(c),
                None => return ReferenceShape::Unsupported(format!("unknown componentType {token}")),
            },
        };
        let container_type = match obj.get(CONTAINER_TYPE) {
            None => None,
            Some(token) => match token.as_str().and_then(ContainerType::from_name) {
                Some(c) => Some(c),
                None => return ReferenceShape::Unsupported(format!("unknown type {token}")),
            },
        };

        ReferenceShape::Reference(Self { byte_offset, component_type, container_type })
    }

    /// JSON form, omitting undeclared types.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(BYTE_OFFSET.into(), Value::from(self.byte_offset));
        if let Some(c) = self.component_type {
            obj.insert(COMPONENT_TYPE.into(), Value::from(c.name()));
        }
        if let Some(t) = self.container_type {
            obj.insert(CONTAINER_TYPE.into(), Value::from(t.name()));
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_reference() {
        let v = json!({"byteOffset": 16, "componentType": "FLOAT", "type": "VEC3"});
        assert_eq!(
            BinaryBodyReference::parse(&v),
            ReferenceShape::Reference(BinaryBodyReference::new(
                16,
                Some(ComponentType::Float),
                Some(ContainerType::Vec3)
            ))
        );
    }

    #[test]
    fn test_parse_partial_reference() {
        let v = json!({"byteOffset": 0});
        assert_eq!(
            BinaryBodyReference::parse(&v),
            ReferenceShape::Reference(BinaryBodyReference::new(0, None, None))
        );
    }

    #[test]
    fn test_parse_literals() {
        for v in [json!(12), json!([1.0, 2.0, 3.0]), json!({"classes": []}), json!("x")] {
            assert_eq!(BinaryBodyReference::parse(&v), ReferenceShape::NotReference);
        }
    }

    #[test]
    fn test_parse_unsupported() {
        let v = json!({"byteOffset": 0, "componentType": "HALF", "type": "SCALAR"});
        assert!(matches!(BinaryBodyReference::parse(&v), ReferenceShape::Unsupported(_)));
        let v = json!({"byteOffset": -4});
        assert!(matches!(BinaryBodyReference::parse(&v), ReferenceShape::Unsupported(_)));
    }

    #[test]
    fn test_to_json_key_order() {
        let r = BinaryBodyReference::new(0, Some(ComponentType::Float), Some(ContainerType::Vec3));
        assert_eq!(
            serde_json::to_string(&r.to_json()).unwrap(),
            r#"{"byteOffset":0,"componentType":"FLOAT","type":"VEC3"}"#
        );
    }
}
