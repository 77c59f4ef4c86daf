//! Feature table: per-tile semantics such as positions, counts and batch ids.

use serde_json::Value;

use super::{header_to_json, parse_table_header, EncodedTable, FeatureTableCodec, TableAccess, TableData, TableHeader};
use crate::format::TileFormat;
use crate::util::{Error, Result};

/// Feature table of one tile. The format tag selects the codec.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTable {
    format: TileFormat,
    pub header: TableHeader,
    pub data: TableData,
}

impl FeatureTable {
    pub fn new(format: TileFormat) -> Self {
        Self {
            format,
            header: TableHeader::new(),
            data: TableData::new(),
        }
    }

    #[inline]
    pub fn format(&self) -> TileFormat {
        self.format
    }

    /// Codec of the format; fails for formats without a feature table.
    pub fn codec(&self) -> Result<&'static dyn FeatureTableCodec> {
        self.format
            .feature_table_codec()
            .ok_or_else(|| Error::invalid(format!("{} tiles have no feature table", self.format)))
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.data.is_empty()
    }

    /// Replace the contents with the sections read from a tile.
    pub fn read(&mut self, json: &[u8], binary: &[u8]) -> Result<()> {
        self.header = parse_table_header(json)?;
        self.data = self.codec()?.decode(&self.header, binary)?;
        tracing::debug!(
            format = %self.format,
            entries = self.header.len(),
            properties = self.data.len(),
            "decoded feature table"
        );
        Ok(())
    }

    /// Serialize both sections. `start_offset` is the tile-relative position
    /// of the JSON header.
    pub fn encode(&self, start_offset: usize) -> Result<EncodedTable> {
        self.codec()?.encode(&self.header, &self.data, start_offset)
    }

    /// JSON form of the header as last read or written.
    pub fn header_json(&self) -> Value {
        header_to_json(&self.header)
    }
}

impl TableAccess for FeatureTable {
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

    #[test]
    fn test_composite_has_no_codec() {
        assert!(TileFormat::Cmpt.feature_table_codec().is_none());
        let table = FeatureTable::new(TileFormat::Cmpt);
        assert!(matches!(table.encode(16), Err(Error::InvalidStructure(_))));
        assert!(FeatureTable::new(TileFormat::Geom).codec().is_ok());
    }
}
