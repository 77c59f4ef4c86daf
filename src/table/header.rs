//! Parsing table JSON headers and resolving references against binary bodies.

use byteorder::ByteOrder;
use serde_json::{Map, Value};

use super::{
    BinaryBodyReference, BinaryProperty, ComponentType, ContainerType, HeaderValue,
    ReferenceShape, TableHeader, TypedArray,
};
use crate::util::{trim_padding, Error, Result};

/// Parse a (possibly padded) table JSON header.
///
/// Empty input yields an empty header. References with type tokens that
/// cannot be interpreted are dropped.
pub fn parse_table_header(json: &[u8]) -> Result<TableHeader> {
    let trimmed = trim_padding(json);
    if trimmed.is_empty() {
        return Ok(TableHeader::new());
    }
    let Value::Object(map) = serde_json::from_slice::<Value>(trimmed)? else {
        return Err(Error::schema("table JSON header must be an object"));
    };

    let mut header = TableHeader::new();
    for (name, value) in map {
        match BinaryBodyReference::parse(&value) {
            ReferenceShape::NotReference => {
                header.insert(name, HeaderValue::Literal(value));
            }
            ReferenceShape::Reference(reference) => {
                header.insert(name, HeaderValue::Reference(reference));
            }
            ReferenceShape::Unsupported(reason) => {
                tracing::debug!(property = %name, %reason, "omitting unsupported property");
            }
        }
    }
    Ok(header)
}

/// JSON object for a header.
pub fn header_to_json(header: &TableHeader) -> Value {
    Value::Object(
        header
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<Map<String, Value>>(),
    )
}

/// Read `count` elements of `component` x `container` at `reference`.
///
/// The referenced span must be aligned to the component width and lie
/// entirely inside `body`.
pub fn resolve_reference<B: ByteOrder>(
    name: &str,
    reference: &BinaryBodyReference,
    body: &[u8],
    component: ComponentType,
    container: ContainerType,
    count: usize,
) -> Result<BinaryProperty> {
    let width = component.num_bytes();
    let start = reference.byte_offset as usize;
    if start % width != 0 {
        return Err(Error::schema(format!(
            "property '{name}' byteOffset {start} is not aligned to {component} ({width} bytes)"
        )));
    }

    let end = count
        .checked_mul(container.num_components() * width)
        .and_then(|len| len.checked_add(start))
        .ok_or_else(|| Error::schema(format!("property '{name}' length overflows")))?;
    if end > body.len() {
        return Err(Error::ReferenceOutOfBounds {
            property: name.to_string(),
            start,
            end,
            len: body.len(),
        });
    }

    let values = TypedArray::read::<B>(component, &body[start..end]);
    tracing::trace!(property = name, start, end, %component, %container, "resolved reference");
    Ok(BinaryProperty::new(container, values))
}
