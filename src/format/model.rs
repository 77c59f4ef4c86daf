//! The [`TileModel`] trait and section plumbing shared by the tile formats.

use std::any::Any;
use std::fmt;
use std::io::{Read, Write};

use super::header::{SectionLengths, TileFormat};
use super::names::{POSITION, POSITION_QUANTIZED, QUANTIZED_VOLUME_OFFSET, QUANTIZED_VOLUME_SCALE, RTC_CENTER};
use crate::encoding::QuantizationParams;
use crate::table::{
    BatchTable, BinaryProperty, ComponentType, ComponentValue, EncodedTable, FeatureTable, TableAccess,
};
use crate::util::{pad_to, read_bytes, DVec3, Error, Result, SECTION_ALIGNMENT};

/// Accepted batch id widths; 16-bit applies when a reference omits the type.
pub const BATCH_ID_COMPONENTS: &[ComponentType] = &[
    ComponentType::UnsignedShort,
    ComponentType::UnsignedByte,
    ComponentType::UnsignedInt,
];

pub const FLOAT_COMPONENTS: &[ComponentType] = &[ComponentType::Float];
pub const UNSIGNED_BYTE_COMPONENTS: &[ComponentType] = &[ComponentType::UnsignedByte];
pub const UNSIGNED_SHORT_COMPONENTS: &[ComponentType] = &[ComponentType::UnsignedShort];
pub const UNSIGNED_INT_COMPONENTS: &[ComponentType] = &[ComponentType::UnsignedInt];

/// One in-memory tile of any format.
///
/// `read` consumes exactly one tile from the stream. `calc_size` is a pure
/// function of the model; `write` stamps the lengths it computes into the
/// header and emits exactly that many bytes.
pub trait TileModel: fmt::Debug + Send + Sync + Any {
    fn format(&self) -> TileFormat;

    fn version(&self) -> u32;

    /// `byteLength` as last read or written.
    fn byte_length(&self) -> u32;

    /// Exact serialized size of the current state.
    fn calc_size(&self) -> Result<u64>;

    fn read(&mut self, reader: &mut dyn Read) -> Result<()>;

    fn write(&mut self, writer: &mut dyn Write) -> Result<()>;

    fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    fn feature_table(&self) -> Option<&FeatureTable> {
        None
    }

    fn batch_table(&self) -> Option<&BatchTable> {
        None
    }

    /// Nested tiles of a composite.
    fn children(&self) -> &[Box<dyn TileModel>] {
        &[]
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn TileModel {
    pub fn downcast_ref<T: TileModel>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: TileModel>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Raw feature and batch table sections of one tile.
#[derive(Debug, Default)]
pub(crate) struct TableSections {
    pub feature_json: Vec<u8>,
    pub feature_binary: Vec<u8>,
    pub batch_json: Vec<u8>,
    pub batch_binary: Vec<u8>,
}

impl TableSections {
    pub fn read<R: Read + ?Sized>(reader: &mut R, lengths: &impl SectionLengths) -> Result<Self> {
        Ok(Self {
            feature_json: read_bytes(reader, lengths.feature_table_json_byte_length().into(), "feature table JSON")?,
            feature_binary: read_bytes(reader, lengths.feature_table_binary_byte_length().into(), "feature table binary")?,
            batch_json: read_bytes(reader, lengths.batch_table_json_byte_length().into(), "batch table JSON")?,
            batch_binary: read_bytes(reader, lengths.batch_table_binary_byte_length().into(), "batch table binary")?,
        })
    }
}

/// Both tables of a tile, encoded for a header of `header_size` bytes.
#[derive(Debug)]
pub(crate) struct EncodedTables {
    pub feature: EncodedTable,
    pub batch: EncodedTable,
}

impl EncodedTables {
    pub fn encode(feature_table: &FeatureTable, batch_table: &BatchTable, header_size: usize) -> Result<Self> {
        let feature = feature_table.encode(header_size)?;
        let batch = batch_table.encode(header_size + feature.len())?;
        Ok(Self { feature, batch })
    }

    /// Combined length of the four sections.
    pub fn len(&self) -> usize {
        self.feature.len() + self.batch.len()
    }

    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.feature.json)?;
        writer.write_all(&self.feature.binary)?;
        writer.write_all(&self.batch.json)?;
        writer.write_all(&self.batch.binary)?;
        Ok(())
    }

    /// Replace the table headers with their rewritten forms.
    pub fn install(self, feature_table: &mut FeatureTable, batch_table: &mut BatchTable) {
        feature_table.header = self.feature.header;
        batch_table.header = self.batch.header;
    }
}

/// Bytes left for the payload once `consumed` bytes of a `byte_length` tile were read.
pub(crate) fn payload_len(byte_length: u32, consumed: u64) -> Result<u64> {
    u64::from(byte_length)
        .checked_sub(consumed)
        .ok_or(Error::SizeMismatch { declared: byte_length.into(), actual: consumed })
}

/// Copy of `payload` padded so that a tile ending with it, written at
/// `offset`, ends on an 8-byte boundary.
pub(crate) fn padded_payload(payload: &[u8], offset: usize, fill: u8) -> Vec<u8> {
    let mut out = payload.to_vec();
    pad_to(&mut out, offset, SECTION_ALIGNMENT, fill);
    out
}

/// Padded payload length without building it.
pub(crate) fn padded_payload_len(len: usize, offset: usize) -> usize {
    len + crate::util::calc_padding(offset + len, SECTION_ALIGNMENT)
}

/// Largest id + 1, or `None` without ids.
pub(crate) fn max_id_count(ids: &[u32]) -> Option<usize> {
    ids.iter().copied().max().map(|m| m as usize + 1)
}

/// Batch ids in 16 bits, widened to 32 when an id does not fit.
pub(crate) fn short_batch_id_property(ids: &[u32]) -> BinaryProperty {
    match ids.iter().map(|&id| u16::try_from(id)).collect::<std::result::Result<Vec<_>, _>>() {
        Ok(narrow) => BinaryProperty::scalars(&narrow),
        Err(_) => BinaryProperty::scalars(ids),
    }
}

/// Copy of a binary property as `N`-component elements of `T`.
pub(crate) fn elements<T: ComponentValue, const N: usize>(table: &impl TableAccess, name: &str) -> Option<Vec<[T; N]>> {
    table.binary(name)?.as_elements::<T, N>().map(<[_]>::to_vec)
}

/// Copy of a scalar binary property stored as `T`.
pub(crate) fn scalars<T: ComponentValue>(table: &impl TableAccess, name: &str) -> Option<Vec<T>> {
    table.binary(name)?.as_slice::<T>().map(<[_]>::to_vec)
}

/// Batch ids of any width, widened.
pub(crate) fn batch_ids(table: &impl TableAccess, name: &str) -> Option<Vec<u32>> {
    table.binary(name)?.to_u32_vec()
}

/// Positions in tile space: `POSITION`, or `POSITION_QUANTIZED` expanded
/// through the quantization volume, offset by `RTC_CENTER`.
pub(crate) fn world_positions(table: &FeatureTable) -> Result<Vec<DVec3>> {
    let mut positions = if let Some(p) = table.binary(POSITION).and_then(|p| p.to_dvec3()) {
        p
    } else if let Some(q) = elements::<u16, 3>(table, POSITION_QUANTIZED) {
        let offset = table.global_dvec3(QUANTIZED_VOLUME_OFFSET)?;
        let scale = table.global_dvec3(QUANTIZED_VOLUME_SCALE)?;
        let (Some(offset), Some(scale)) = (offset, scale) else {
            return Err(Error::schema(format!(
                "{POSITION_QUANTIZED} requires {QUANTIZED_VOLUME_OFFSET} and {QUANTIZED_VOLUME_SCALE}"
            )));
        };
        let params = QuantizationParams::from_volume(offset, scale);
        q.into_iter().map(|p| params.unquantize_point(p)).collect()
    } else {
        Vec::new()
    };

    if let Some(center) = table.global_dvec3(RTC_CENTER)? {
        for p in &mut positions {
            *p += center;
        }
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_len() {
        assert_eq!(payload_len(100, 60).unwrap(), 40);
        assert_eq!(payload_len(60, 60).unwrap(), 0);
        assert!(matches!(payload_len(20, 28), Err(Error::SizeMismatch { declared: 20, actual: 28 })));
    }

    #[test]
    fn test_padded_payload() {
        let glb = padded_payload(b"glTF12345", 28, b' ');
        assert_eq!(glb.len(), 12);
        assert_eq!((28 + glb.len()) % 8, 0);
        assert_eq!(padded_payload_len(9, 28), 12);
        assert_eq!(padded_payload_len(0, 32), 0);
    }

    #[test]
    fn test_short_batch_ids() {
        let ids = short_batch_id_property(&[0, 1, 2]);
        assert_eq!(ids.component_type(), ComponentType::UnsignedShort);
        let wide = short_batch_id_property(&[0, 70_000]);
        assert_eq!(wide.as_slice::<u32>(), Some(&[0u32, 70_000][..]));
    }

    #[test]
    fn test_world_positions_quantized() {
        use crate::table::dvec3_json;

        let mut ft = FeatureTable::new(TileFormat::Pnts);
        ft.set_literal(QUANTIZED_VOLUME_OFFSET, dvec3_json(DVec3::new(-1.0, 0.0, 0.0)));
        ft.set_literal(QUANTIZED_VOLUME_SCALE, dvec3_json(DVec3::new(2.0, 0.0, 65535.0)));
        ft.set_literal(RTC_CENTER, dvec3_json(DVec3::new(100.0, 0.0, 0.0)));
        ft.set_binary(POSITION_QUANTIZED, BinaryProperty::vectors(&[[0u16, 9, 10], [65535, 0, 65535]]));

        let p = world_positions(&ft).unwrap();
        assert_eq!(p, vec![DVec3::new(99.0, 0.0, 10.0), DVec3::new(101.0, 0.0, 65535.0)]);
    }

    #[test]
    fn test_world_positions_requires_volume() {
        let mut ft = FeatureTable::new(TileFormat::I3dm);
        ft.set_binary(POSITION_QUANTIZED, BinaryProperty::vectors(&[[1u16, 2, 3]]));
        assert!(matches!(world_positions(&ft), Err(Error::Schema(_))));
    }

    #[test]
    fn test_max_id_count() {
        assert_eq!(max_id_count(&[]), None);
        assert_eq!(max_id_count(&[3, 0, 7]), Some(8));
    }
}
