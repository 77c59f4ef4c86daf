//! Batched 3D model tiles (`b3dm`).
//!
//! Layout: [`TileHeader`], feature table, batch table, then a binary glTF
//! padded with spaces so the tile ends on an 8-byte boundary.

use std::any::Any;
use std::io::{Read, Write};

use serde_json::Value;

use super::gltf::trim_glb;
use super::header::{SectionLengths, TileByteOrder, TileFormat, TileHeader, B3DM_MAGIC};
use super::model::{padded_payload, padded_payload_len, payload_len, EncodedTables, TableSections, TileModel};
use super::names::{BATCH_LENGTH, RTC_CENTER};
use super::stream::TileWriter;
use crate::table::{dvec3_json, BatchTable, FeatureTable, SemanticCodec, TableAccess};
use crate::util::{read_bytes, to_u32, DVec3, Result, JSON_PADDING};

/// b3dm feature tables hold only literals; extra typed properties are
/// counted by `BATCH_LENGTH`.
pub static B3DM_FEATURE_TABLE: SemanticCodec = SemanticCodec::new(&[], &[BATCH_LENGTH]);

/// Typed view of a b3dm feature table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchedFeatures {
    pub batch_length: u32,
    pub rtc_center: Option<DVec3>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct B3dm {
    pub header: TileHeader,
    pub feature_table: FeatureTable,
    pub batch_table: BatchTable,
    /// Model payload as stored, including trailing padding.
    pub glb: Vec<u8>,
}

impl Default for B3dm {
    fn default() -> Self {
        Self::new()
    }
}

impl B3dm {
    pub fn new() -> Self {
        let mut feature_table = FeatureTable::new(TileFormat::B3dm);
        feature_table.set_literal(BATCH_LENGTH, Value::from(0));
        Self {
            header: TileHeader::new(B3DM_MAGIC),
            feature_table,
            batch_table: BatchTable::new(),
            glb: Vec::new(),
        }
    }

    /// Tile holding `glb` with no batched features.
    pub fn with_glb(glb: Vec<u8>) -> Self {
        Self { glb, ..Self::new() }
    }

    pub fn batch_length(&self) -> Result<usize> {
        Ok(self.feature_table.literal_u32(BATCH_LENGTH)?.unwrap_or(0) as usize)
    }

    pub fn features(&self) -> Result<BatchedFeatures> {
        Ok(BatchedFeatures {
            batch_length: self.feature_table.literal_u32(BATCH_LENGTH)?.unwrap_or(0),
            rtc_center: self.feature_table.literal_dvec3(RTC_CENTER)?,
        })
    }

    pub fn set_features(&mut self, features: &BatchedFeatures) {
        let ft = &mut self.feature_table;
        ft.set_literal(BATCH_LENGTH, Value::from(features.batch_length));
        ft.set_optional_literal(RTC_CENTER, features.rtc_center.map(dvec3_json));
    }

    /// The binary glTF without the padding that follows it.
    pub fn embedded_glb(&self) -> &[u8] {
        trim_glb(&self.glb)
    }

    fn encode_tables(&self) -> Result<EncodedTables> {
        EncodedTables::encode(&self.feature_table, &self.batch_table, TileHeader::SIZE)
    }
}

impl TileModel for B3dm {
    fn format(&self) -> TileFormat {
        TileFormat::B3dm
    }

    fn version(&self) -> u32 {
        self.header.version
    }

    fn byte_length(&self) -> u32 {
        self.header.byte_length
    }

    fn calc_size(&self) -> Result<u64> {
        let offset = TileHeader::SIZE + self.encode_tables()?.len();
        Ok((offset + padded_payload_len(self.glb.len(), offset)) as u64)
    }

    fn read(&mut self, reader: &mut dyn Read) -> Result<()> {
        let header = TileHeader::read::<TileByteOrder>(reader, B3DM_MAGIC)?;
        let sections = TableSections::read(reader, &header)?;
        self.feature_table.read(&sections.feature_json, &sections.feature_binary)?;
        let batch_length = self.batch_length()?;
        self.batch_table.read(&sections.batch_json, &sections.batch_binary, batch_length)?;

        let remaining = payload_len(header.byte_length, TileHeader::SIZE as u64 + header.table_sections_len())?;
        self.glb = read_bytes(reader, remaining, "b3dm glTF")?;
        self.header = header;
        tracing::debug!(byte_length = header.byte_length, batch_length, glb = self.glb.len(), "read b3dm");
        Ok(())
    }

    fn write(&mut self, writer: &mut dyn Write) -> Result<()> {
        let tables = self.encode_tables()?;
        let offset = TileHeader::SIZE + tables.len();
        let glb = padded_payload(&self.glb, offset, JSON_PADDING);
        let total = offset + glb.len();

        self.header.byte_length = to_u32(total, "b3dm tile")?;
        self.header.stamp_tables(&tables.feature, &tables.batch)?;

        let mut out = TileWriter::new(writer);
        self.header.write::<TileByteOrder>(&mut out)?;
        tables.write(&mut out)?;
        out.write_bytes(&glb)?;
        out.finish(total as u64)?;

        tables.install(&mut self.feature_table, &mut self.batch_table);
        tracing::debug!(byte_length = total, "wrote b3dm");
        Ok(())
    }

    fn feature_table(&self) -> Option<&FeatureTable> {
        Some(&self.feature_table)
    }

    fn batch_table(&self) -> Option<&BatchTable> {
        Some(&self.batch_table)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::BinaryProperty;
    use crate::util::Error;
    use std::io::Cursor;

    fn sample_glb() -> Vec<u8> {
        let mut glb = b"glTF".to_vec();
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&20u32.to_le_bytes());
        glb.extend_from_slice(b"12345678");
        glb
    }

    #[test]
    fn test_write_read_roundtrip() {
        let mut tile = B3dm::with_glb(sample_glb());
        tile.set_features(&BatchedFeatures { batch_length: 2, rtc_center: Some(DVec3::new(1.0, 2.0, 3.0)) });
        tile.batch_table.set_binary("height", BinaryProperty::scalars(&[1.5f32, 2.5]));

        let size = tile.calc_size().unwrap();
        let bytes = tile.to_bytes().unwrap();
        assert_eq!(bytes.len() as u64, size);
        assert_eq!(bytes.len() % 8, 0);
        assert_eq!(tile.byte_length() as usize, bytes.len());

        let mut back = B3dm::new();
        back.read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back.features().unwrap(), tile.features().unwrap());
        assert_eq!(back.embedded_glb(), &sample_glb()[..]);
        assert_eq!(back.batch_table.get("height", 1), Some(serde_json::json!(2.5)));
        assert_eq!(back.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_calc_size_is_pure() {
        let mut tile = B3dm::with_glb(sample_glb());
        tile.batch_table.set_binary("id", BinaryProperty::scalars(&[7u32]));
        let before = tile.clone();
        assert_eq!(tile.calc_size().unwrap(), tile.calc_size().unwrap());
        assert_eq!(tile, before);
    }

    #[test]
    fn test_declared_length_too_small() {
        let mut bytes = B3dm::with_glb(sample_glb()).to_bytes().unwrap();
        bytes[8..12].copy_from_slice(&20u32.to_le_bytes());
        let err = B3dm::new().read(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { declared: 20, .. }));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = B3dm::with_glb(sample_glb()).to_bytes().unwrap();
        let err = B3dm::new().read(&mut Cursor::new(&bytes[..bytes.len() - 4])).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof(_)));
    }
}
