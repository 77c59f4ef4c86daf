//! Batch table: application-defined per-feature properties.

use serde_json::Value;

use super::{
    header_to_json, parse_table_header, resolve_reference, BatchTableHierarchy, BinaryBodyBuilder,
    EncodedTable, HeaderValue, PropertyValue, TableAccess, TableData, TableHeader,
    BATCH_TABLE_HIERARCHY, EXTENSIONS,
};
use crate::format::TileByteOrder;
use crate::util::Result;

/// Batch table of one tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchTable {
    pub header: TableHeader,
    pub data: TableData,
}

impl BatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.data.is_empty()
    }

    /// Replace the contents with the sections read from a tile.
    ///
    /// Fully typed references resolve to `batch_length` elements, inline
    /// arrays are kept as they are, other literals stay in the header.
    pub fn read(&mut self, json: &[u8], binary: &[u8], batch_length: usize) -> Result<()> {
        self.header = parse_table_header(json)?;
        self.data = TableData::new();

        for (name, value) in &self.header {
            match value {
                HeaderValue::Reference(reference) => {
                    let (Some(component), Some(container)) = (reference.component_type, reference.container_type) else {
                        tracing::debug!(property = %name, "omitting batch table reference without component or container type");
                        continue;
                    };
                    let property = resolve_reference::<TileByteOrder>(
                        name,
                        reference,
                        binary,
                        component,
                        container,
                        batch_length,
                    )?;
                    self.data.insert(name.clone(), PropertyValue::Binary(property));
                }
                HeaderValue::Literal(Value::Array(items)) => {
                    self.data.insert(name.clone(), PropertyValue::Inline(items.clone()));
                }
                HeaderValue::Literal(_) => {}
            }
        }
        tracing::debug!(batch_length, properties = self.data.len(), "decoded batch table");
        Ok(())
    }

    /// Serialize both sections, laying properties out in name order.
    pub fn encode(&self, start_offset: usize) -> Result<EncodedTable> {
        let mut builder = BinaryBodyBuilder::<TileByteOrder>::new();
        for (name, value) in &self.header {
            if let HeaderValue::Literal(v) = value {
                if !self.data.contains_key(name) {
                    builder.add_literal(name, v.clone());
                }
            }
        }
        for (name, value) in &self.data {
            match value {
                PropertyValue::Binary(p) => builder.add_property(name, p)?,
                PropertyValue::Inline(items) => builder.add_literal(name, items.clone().into()),
            }
        }
        builder.finish(start_offset)
    }

    /// Value of `name` for one batch id.
    pub fn get(&self, name: &str, batch_id: usize) -> Option<Value> {
        self.data.get(name)?.element_json(batch_id)
    }

    /// Property names, excluding `extensions` and other non-array literals.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// The hierarchy extension, if present.
    pub fn hierarchy(&self) -> Result<Option<BatchTableHierarchy>> {
        match self.literal(EXTENSIONS).and_then(|ext| ext.get(BATCH_TABLE_HIERARCHY)) {
            Some(value) => Ok(Some(BatchTableHierarchy::from_json(value)?)),
            None => Ok(None),
        }
    }

    /// Install or replace the hierarchy extension, keeping other extensions.
    pub fn set_hierarchy(&mut self, hierarchy: &BatchTableHierarchy) -> Result<()> {
        let mut extensions = match self.literal(EXTENSIONS) {
            Some(Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        extensions.insert(BATCH_TABLE_HIERARCHY.to_string(), hierarchy.to_json()?);
        self.set_literal(EXTENSIONS, Value::Object(extensions));
        Ok(())
    }

    pub fn header_json(&self) -> Value {
        header_to_json(&self.header)
    }
}

impl TableAccess for BatchTable {
    fn table_header(&self) -> &TableHeader {
        &self.header
    }
    fn table_header_mut(&mut self) -> &mut TableHeader {
        &mut self.header
    }
    fn table_data(&self) -> &TableData {
        &self.data
    }
    fn table_data_mut(&mut self) -> &mut TableData {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{BinaryProperty, HierarchyClass};
    use crate::util::Error;
    use serde_json::json;

    fn roundtrip(table: &BatchTable, batch_length: usize) -> BatchTable {
        let encoded = table.encode(0).unwrap();
        let mut back = BatchTable::new();
        back.read(&encoded.json, &encoded.binary, batch_length).unwrap();
        back
    }

    #[test]
    fn test_binary_and_inline_properties() {
        let mut table = BatchTable::new();
        table.set_binary("height", BinaryProperty::scalars(&[10.5f64, 20.0]));
        table.set_binary("color", BinaryProperty::vectors(&[[255u8, 0, 0], [0, 255, 0]]));
        table.set_property("name", PropertyValue::Inline(vec![json!("a"), json!("b")]));

        let back = roundtrip(&table, 2);
        assert_eq!(back.data, table.data);
        assert_eq!(back.get("height", 1), Some(json!(20.0)));
        assert_eq!(back.get("color", 0), Some(json!([255, 0, 0])));
        assert_eq!(back.get("name", 1), Some(json!("b")));
        assert_eq!(back.get("name", 2), None);
        assert_eq!(back.property_names().collect::<Vec<_>>(), vec!["color", "height", "name"]);
    }

    #[test]
    fn test_untyped_reference_is_omitted() {
        let mut table = BatchTable::new();
        table.read(br#"{"id":{"byteOffset":0}}"#, &[0u8; 8], 2).unwrap();
        assert!(table.data.is_empty());
    }

    #[test]
    fn test_reference_out_of_bounds() {
        let mut table = BatchTable::new();
        let err = table
            .read(
                br#"{"id":{"byteOffset":8,"componentType":"UNSIGNED_INT","type":"SCALAR"}}"#,
                &[0u8; 8],
                1,
            )
            .unwrap_err();
        assert!(matches!(err, Error::ReferenceOutOfBounds { .. }));
    }

    #[test]
    fn test_hierarchy_carried_opaquely() {
        let mut table = BatchTable::new();
        table.set_literal(EXTENSIONS, json!({"OTHER_EXT": {"x": 1}}));
        let hierarchy = BatchTableHierarchy {
            classes: vec![HierarchyClass { name: "Tree".into(), length: 1, ..Default::default() }],
            instances_length: 1,
            class_ids: vec![0],
            parent_counts: None,
            parent_ids: None,
        };
        table.set_hierarchy(&hierarchy).unwrap();

        let back = roundtrip(&table, 0);
        assert_eq!(back.hierarchy().unwrap(), Some(hierarchy));
        assert_eq!(back.literal(EXTENSIONS).unwrap()["OTHER_EXT"], json!({"x": 1}));
        assert!(back.data.is_empty());
    }
}
