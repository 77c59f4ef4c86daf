//! Per-format feature table codecs.
//!
//! Each tile format declares the binary properties its feature table
//! understands as a static list of [`SemanticProperty`] entries; the
//! [`SemanticCodec`] turns that list into decode and encode.

use std::fmt;

use super::{
    resolve_reference, BinaryBodyBuilder, BinaryProperty, ComponentType, ContainerType, EncodedTable, HeaderValue,
    PropertyValue, ReferenceForm, TableData, TableHeader,
};
use crate::format::TileByteOrder;
use crate::util::{Error, Result};

/// Format-specific half of the feature table codec.
pub trait FeatureTableCodec: fmt::Debug + Send + Sync {
    /// Resolve the binary properties referenced by `header`.
    fn decode(&self, header: &TableHeader, body: &[u8]) -> Result<TableData>;

    /// Lay out `data` into a fresh header and binary body.
    fn encode(&self, header: &TableHeader, data: &TableData, start_offset: usize) -> Result<EncodedTable>;
}

/// A well-known feature table property of one format.
#[derive(Clone, Copy, Debug)]
pub struct SemanticProperty {
    pub name: &'static str,
    /// Accepted component types; the first one applies when a reference
    /// omits `componentType`.
    pub component_types: &'static [ComponentType],
    pub container: ContainerType,
    /// Header literals holding the element count, tried in order. Empty for
    /// tile-global properties, which hold exactly one element.
    pub length_keys: &'static [&'static str],
    /// Elements per counted item (16 for a box matrix stored as scalars).
    pub per_item: usize,
}

impl SemanticProperty {
    pub const fn new(
        name: &'static str,
        component_types: &'static [ComponentType],
        container: ContainerType,
        length_keys: &'static [&'static str],
    ) -> Self {
        Self { name, component_types, container, length_keys, per_item: 1 }
    }

    pub const fn per_item(mut self, per_item: usize) -> Self {
        self.per_item = per_item;
        self
    }

    #[inline]
    pub fn default_component(&self) -> ComponentType {
        self.component_types.first().copied().unwrap_or(ComponentType::Float)
    }
}

/// Schema-driven [`FeatureTableCodec`].
#[derive(Debug)]
pub struct SemanticCodec {
    pub properties: &'static [SemanticProperty],
    /// Element count applied to fully typed references outside the schema.
    /// Empty when the format has no single per-feature count.
    pub length_keys: &'static [&'static str],
}

impl SemanticCodec {
    pub const fn new(properties: &'static [SemanticProperty], length_keys: &'static [&'static str]) -> Self {
        Self { properties, length_keys }
    }

    pub fn find(&self, name: &str) -> Option<&SemanticProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// First count literal present among `keys`, 0 if none is.
pub fn literal_count(header: &TableHeader, keys: &[&str]) -> Result<Option<usize>> {
    for key in keys {
        if let Some(HeaderValue::Literal(value)) = header.get(*key) {
            let count = value
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| Error::schema(format!("{key} must be an unsigned integer, got {value}")))?;
            return Ok(Some(count));
        }
    }
    Ok(None)
}

impl SemanticCodec {
    /// Keep the type fields a declared reference left out, as long as the
    /// current value still has the types a reader would infer.
    fn reference_form(&self, header: &TableHeader, name: &str, property: &BinaryProperty) -> ReferenceForm {
        let (Some(prop), Some(HeaderValue::Reference(declared))) = (self.find(name), header.get(name)) else {
            return ReferenceForm::Full;
        };
        let form = ReferenceForm::of(declared);
        let component_implied = property.component_type() == prop.default_component();
        let container_implied = property.container == prop.container;
        match form {
            ReferenceForm::OffsetOnly if component_implied && container_implied => form,
            ReferenceForm::OffsetOnly if component_implied => ReferenceForm::NoComponent,
            ReferenceForm::OffsetOnly if container_implied => ReferenceForm::NoContainer,
            ReferenceForm::NoComponent if component_implied => form,
            ReferenceForm::NoContainer if container_implied => form,
            _ => ReferenceForm::Full,
        }
    }
}

impl FeatureTableCodec for SemanticCodec {
    fn decode(&self, header: &TableHeader, body: &[u8]) -> Result<TableData> {
        let mut data = TableData::new();

        for (name, value) in header {
            let HeaderValue::Reference(reference) = value else {
                continue;
            };

            let (component, container, count) = match self.find(name) {
                Some(prop) => {
                    let component = reference.component_type.unwrap_or_else(|| prop.default_component());
                    let container = reference.container_type.unwrap_or(prop.container);
                    if !prop.component_types.contains(&component) || container != prop.container {
                        tracing::debug!(property = %name, %component, %container, "omitting unsupported type");
                        continue;
                    }
                    let items = if prop.length_keys.is_empty() {
                        1
                    } else {
                        literal_count(header, prop.length_keys)?.unwrap_or(0)
                    };
                    (component, container, items * prop.per_item)
                }
                None => match (reference.component_type, reference.container_type, literal_count(header, self.length_keys)?) {
                    (Some(component), Some(container), Some(count)) => (component, container, count),
                    _ => {
                        tracing::debug!(property = %name, "omitting reference without a known element count");
                        continue;
                    }
                },
            };

            let property = resolve_reference::<TileByteOrder>(name, reference, body, component, container, count)?;
            data.insert(name.clone(), PropertyValue::Binary(property));
        }
        Ok(data)
    }

    fn encode(&self, header: &TableHeader, data: &TableData, start_offset: usize) -> Result<EncodedTable> {
        let mut builder = BinaryBodyBuilder::<TileByteOrder>::new();

        for (name, value) in header {
            if let HeaderValue::Literal(v) = value {
                if !data.contains_key(name) {
                    builder.add_literal(name, v.clone());
                }
            }
        }

        let known = self.properties.iter().filter_map(|p| data.get_key_value(p.name));
        let extra = data.iter().filter(|(name, _)| self.find(name).is_none());
        for (name, value) in known.chain(extra) {
            match value {
                PropertyValue::Binary(p) => builder.add_property_as(name, p, self.reference_form(header, name, p))?,
                PropertyValue::Inline(items) => builder.add_literal(name, items.clone().into()),
            }
        }

        builder.finish_object(start_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{parse_table_header, BinaryBodyReference};

    static POINT_PROPS: [SemanticProperty; 3] = [
        SemanticProperty::new("POSITION", &[ComponentType::Float], ContainerType::Vec3, &["POINTS_LENGTH"]),
        SemanticProperty::new(
            "BATCH_ID",
            &[ComponentType::UnsignedShort, ComponentType::UnsignedByte, ComponentType::UnsignedInt],
            ContainerType::Scalar,
            &["POINTS_LENGTH"],
        ),
        SemanticProperty::new("RTC_CENTER", &[ComponentType::Float], ContainerType::Vec3, &[]),
    ];
    static CODEC: SemanticCodec = SemanticCodec::new(&POINT_PROPS, &["POINTS_LENGTH"]);

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_defaults_component_type() {
        let header = parse_table_header(br#"{"BATCH_ID":{"byteOffset":0},"POINTS_LENGTH":2}"#).unwrap();
        let body: Vec<u8> = [5u16, 6].iter().flat_map(|v| v.to_le_bytes()).collect();
        let data = CODEC.decode(&header, &body).unwrap();
        let ids = data["BATCH_ID"].as_binary().unwrap();
        assert_eq!(ids.as_slice::<u16>(), Some(&[5u16, 6][..]));
    }

    #[test]
    fn test_decode_global_reference() {
        let header = parse_table_header(br#"{"RTC_CENTER":{"byteOffset":4},"POINTS_LENGTH":0}"#).unwrap();
        let data = CODEC.decode(&header, &f32_bytes(&[0.0, 1.0, 2.0, 3.0])).unwrap();
        assert_eq!(data["RTC_CENTER"].as_binary().unwrap().as_slice::<f32>(), Some(&[1.0f32, 2.0, 3.0][..]));
    }

    #[test]
    fn test_decode_omits_unsupported_combination() {
        let header = parse_table_header(
            br#"{"POSITION":{"byteOffset":0,"componentType":"INT","type":"VEC3"},"POINTS_LENGTH":1}"#,
        )
        .unwrap();
        let data = CODEC.decode(&header, &[0u8; 16]).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_decode_extra_property_uses_format_count() {
        let header = parse_table_header(
            br#"{"INTENSITY":{"byteOffset":0,"componentType":"FLOAT","type":"SCALAR"},"POINTS_LENGTH":2}"#,
        )
        .unwrap();
        let data = CODEC.decode(&header, &f32_bytes(&[0.25, 0.75])).unwrap();
        assert_eq!(data["INTENSITY"].as_binary().unwrap().as_slice::<f32>(), Some(&[0.25f32, 0.75][..]));
    }

    #[test]
    fn test_decode_out_of_bounds_is_schema_error() {
        let header = parse_table_header(
            br#"{"POSITION":{"byteOffset":0,"componentType":"FLOAT","type":"VEC3"},"POINTS_LENGTH":3}"#,
        )
        .unwrap();
        let err = CODEC.decode(&header, &f32_bytes(&[1.0; 6])).unwrap_err();
        assert!(matches!(err, Error::ReferenceOutOfBounds { .. }));
    }

    #[test]
    fn test_encode_keeps_offset_only_reference() {
        let json = br#"{"POINTS_LENGTH":1,"POSITION":{"byteOffset":0}}"#;
        let header = parse_table_header(json).unwrap();
        let data = CODEC.decode(&header, &f32_bytes(&[1.0, 2.0, 3.0])).unwrap();
        let table = CODEC.encode(&header, &data, 0).unwrap();
        assert!(table.json.starts_with(json));
        assert_eq!(table.binary, f32_bytes(&[1.0, 2.0, 3.0, 0.0]));
    }

    #[test]
    fn test_encode_restores_types_that_changed() {
        let header = parse_table_header(br#"{"BATCH_ID":{"byteOffset":0},"POINTS_LENGTH":1}"#).unwrap();
        let mut data = TableData::new();
        data.insert("BATCH_ID".into(), PropertyValue::Binary(BinaryProperty::scalars(&[7u8])));
        let table = CODEC.encode(&header, &data, 0).unwrap();
        assert_eq!(
            table.header["BATCH_ID"],
            HeaderValue::Reference(BinaryBodyReference::new(0, Some(ComponentType::UnsignedByte), None))
        );
    }

    #[test]
    fn test_encode_empty_header_writes_object() {
        let table = CODEC.encode(&TableHeader::new(), &TableData::new(), 28).unwrap();
        assert_eq!(table.json, b"{}  ");
    }

    #[test]
    fn test_encode_schema_order_first() {
        let mut header = TableHeader::new();
        header.insert("POINTS_LENGTH".into(), HeaderValue::Literal(1.into()));
        let mut data = TableData::new();
        data.insert("A_EXTRA".into(), PropertyValue::Binary(BinaryProperty::scalars(&[1u8])));
        data.insert("POSITION".into(), PropertyValue::Binary(BinaryProperty::vectors(&[[1.0f32, 2.0, 3.0]])));

        let table = CODEC.encode(&header, &data, 0).unwrap();
        let offset = |name: &str| match &table.header[name] {
            HeaderValue::Reference(r) => r.byte_offset,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(offset("POSITION"), 0);
        assert_eq!(offset("A_EXTRA"), 12);
        assert_eq!(table.binary.len(), 16);
    }
}
