//! Vector data tiles (`vctr`).
//!
//! Layout: [`VctrHeader`], feature table, batch table, then four geometry
//! sections in fixed order:
//!
//! 1. polygon indices, `u32` each
//! 2. polygon positions, planar zig-zag `u[]` then `v[]`
//! 3. polyline positions, planar zig-zag `u[]`, `v[]`, `h[]`
//! 4. point positions, same layout as polylines
//!
//! The tile is zero padded to an 8-byte boundary after the last section.

use std::any::Any;
use std::io::{Read, Write};

use byteorder::ByteOrder;
use serde_json::Value;

use super::header::{SectionLengths, TileByteOrder, TileFormat, VctrHeader};
use super::model::{
    batch_ids, max_id_count, padded_payload, padded_payload_len, payload_len, scalars, short_batch_id_property,
    EncodedTables, TableSections, TileModel, BATCH_ID_COMPONENTS, FLOAT_COMPONENTS, UNSIGNED_INT_COMPONENTS,
    UNSIGNED_SHORT_COMPONENTS,
};
use super::names::*;
use super::stream::TileWriter;
use crate::encoding::{decode_positions2, decode_positions3, encode_positions2, encode_positions3};
use crate::table::{
    dvec3_json, BatchTable, BinaryProperty, ComponentType, ContainerType, FeatureTable, SemanticCodec,
    SemanticProperty, TableAccess,
};
use crate::util::{read_bytes, to_u32, DVec3, Error, Result, BINARY_PADDING, SECTION_ALIGNMENT};

/// West, south, east, north (radians), minimum and maximum height (meters).
pub const REGION_VALUES: usize = 6;

const POLYGON_COUNT: &[&str] = &[POLYGONS_LENGTH];
const POLYLINE_COUNT: &[&str] = &[POLYLINES_LENGTH];
const POINT_COUNT: &[&str] = &[POINTS_LENGTH];

static VCTR_PROPERTIES: [SemanticProperty; 11] = [
    SemanticProperty::new(POLYGON_COUNTS, UNSIGNED_INT_COMPONENTS, ContainerType::Scalar, POLYGON_COUNT),
    SemanticProperty::new(POLYGON_INDEX_COUNTS, UNSIGNED_INT_COMPONENTS, ContainerType::Scalar, POLYGON_COUNT),
    SemanticProperty::new(POLYGON_MINIMUM_HEIGHTS, FLOAT_COMPONENTS, ContainerType::Scalar, POLYGON_COUNT),
    SemanticProperty::new(POLYGON_MAXIMUM_HEIGHTS, FLOAT_COMPONENTS, ContainerType::Scalar, POLYGON_COUNT),
    SemanticProperty::new(POLYGON_BATCH_IDS, BATCH_ID_COMPONENTS, ContainerType::Scalar, POLYGON_COUNT),
    SemanticProperty::new(POLYLINE_COUNTS, UNSIGNED_INT_COMPONENTS, ContainerType::Scalar, POLYLINE_COUNT),
    SemanticProperty::new(POLYLINE_WIDTHS, UNSIGNED_SHORT_COMPONENTS, ContainerType::Scalar, POLYLINE_COUNT),
    SemanticProperty::new(POLYLINE_BATCH_IDS, BATCH_ID_COMPONENTS, ContainerType::Scalar, POLYLINE_COUNT),
    SemanticProperty::new(POINT_BATCH_IDS, BATCH_ID_COMPONENTS, ContainerType::Scalar, POINT_COUNT),
    SemanticProperty::new(REGION, &[ComponentType::Double, ComponentType::Float], ContainerType::Scalar, &[])
        .per_item(REGION_VALUES),
    SemanticProperty::new(RTC_CENTER, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
];

pub static VCTR_FEATURE_TABLE: SemanticCodec = SemanticCodec::new(&VCTR_PROPERTIES, &[]);

/// Typed view of a vctr feature table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorFeatures {
    pub region: Option<[f64; REGION_VALUES]>,
    pub rtc_center: Option<DVec3>,
    pub polygons_length: u32,
    pub polygon_counts: Option<Vec<u32>>,
    pub polygon_index_counts: Option<Vec<u32>>,
    pub polygon_minimum_heights: Option<Vec<f32>>,
    pub polygon_maximum_heights: Option<Vec<f32>>,
    pub polygon_batch_ids: Option<Vec<u32>>,
    pub polylines_length: u32,
    pub polyline_counts: Option<Vec<u32>>,
    pub polyline_widths: Option<Vec<u16>>,
    pub polyline_batch_ids: Option<Vec<u32>>,
    pub points_length: u32,
    pub point_batch_ids: Option<Vec<u32>>,
    pub batch_length: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vctr {
    pub header: VctrHeader,
    pub feature_table: FeatureTable,
    pub batch_table: BatchTable,
    pub polygon_indices: Vec<u32>,
    /// Polygon vertices on the `0..=32767` u/v grid of the region.
    pub polygon_positions: Vec<[u16; 2]>,
    /// Polyline vertices as u/v/height grid coordinates.
    pub polyline_positions: Vec<[u16; 3]>,
    pub point_positions: Vec<[u16; 3]>,
}

impl Default for Vctr {
    fn default() -> Self {
        Self::new()
    }
}

/// Encoded geometry sections, in file order.
struct GeometrySections {
    polygon_indices: Vec<u8>,
    polygon_positions: Vec<u8>,
    polyline_positions: Vec<u8>,
    point_positions: Vec<u8>,
}

impl GeometrySections {
    fn len(&self) -> usize {
        self.polygon_indices.len()
            + self.polygon_positions.len()
            + self.polyline_positions.len()
            + self.point_positions.len()
    }
}

fn u16_bytes(planes: &[Vec<u16>]) -> Vec<u8> {
    let total = planes.iter().map(Vec::len).sum::<usize>();
    let mut out = vec![0u8; total * 2];
    let mut at = 0;
    for plane in planes {
        TileByteOrder::write_u16_into(plane, &mut out[at..at + plane.len() * 2]);
        at += plane.len() * 2;
    }
    out
}

/// Split a section into `planes` equally long `u16` arrays.
fn u16_planes(bytes: &[u8], planes: usize, section: &str) -> Result<Vec<Vec<u16>>> {
    let stride = planes * 2;
    if bytes.len() % stride != 0 {
        return Err(Error::invalid(format!(
            "{section} length {} is not a multiple of {stride}",
            bytes.len()
        )));
    }
    let count = bytes.len() / stride;
    if count == 0 {
        return Ok(vec![Vec::new(); planes]);
    }
    Ok(bytes
        .chunks_exact(count * 2)
        .take(planes)
        .map(|plane| {
            let mut values = vec![0u16; count];
            TileByteOrder::read_u16_into(plane, &mut values);
            values
        })
        .collect())
}

impl Vctr {
    pub fn new() -> Self {
        let mut feature_table = FeatureTable::new(TileFormat::Vctr);
        for key in [POLYGONS_LENGTH, POLYLINES_LENGTH, POINTS_LENGTH] {
            feature_table.set_literal(key, Value::from(0));
        }
        Self {
            header: VctrHeader::new(),
            feature_table,
            batch_table: BatchTable::new(),
            polygon_indices: Vec::new(),
            polygon_positions: Vec::new(),
            polyline_positions: Vec::new(),
            point_positions: Vec::new(),
        }
    }

    /// `BATCH_LENGTH`, or the largest batch id of any kind + 1, or 0.
    pub fn batch_length(&self) -> Result<usize> {
        if let Some(n) = self.feature_table.literal_u32(BATCH_LENGTH)? {
            return Ok(n as usize);
        }
        let ft = &self.feature_table;
        Ok([POLYGON_BATCH_IDS, POLYLINE_BATCH_IDS, POINT_BATCH_IDS]
            .into_iter()
            .filter_map(|name| batch_ids(ft, name).as_deref().and_then(max_id_count))
            .max()
            .unwrap_or(0))
    }

    /// The `REGION` bounds, from a literal or a binary property.
    pub fn region(&self) -> Result<Option<[f64; REGION_VALUES]>> {
        let ft = &self.feature_table;
        if let Some(region) = ft.literal_f64s::<REGION_VALUES>(REGION)? {
            return Ok(Some(region));
        }
        Ok(ft.binary(REGION).and_then(|p| p.values.to_f64_vec().try_into().ok()))
    }

    pub fn features(&self) -> Result<VectorFeatures> {
        let ft = &self.feature_table;
        let count = |key| -> Result<u32> { Ok(ft.literal_u32(key)?.unwrap_or(0)) };
        Ok(VectorFeatures {
            region: self.region()?,
            rtc_center: ft.global_dvec3(RTC_CENTER)?,
            polygons_length: count(POLYGONS_LENGTH)?,
            polygon_counts: scalars(ft, POLYGON_COUNTS),
            polygon_index_counts: scalars(ft, POLYGON_INDEX_COUNTS),
            polygon_minimum_heights: scalars(ft, POLYGON_MINIMUM_HEIGHTS),
            polygon_maximum_heights: scalars(ft, POLYGON_MAXIMUM_HEIGHTS),
            polygon_batch_ids: batch_ids(ft, POLYGON_BATCH_IDS),
            polylines_length: count(POLYLINES_LENGTH)?,
            polyline_counts: scalars(ft, POLYLINE_COUNTS),
            polyline_widths: scalars(ft, POLYLINE_WIDTHS),
            polyline_batch_ids: batch_ids(ft, POLYLINE_BATCH_IDS),
            points_length: count(POINTS_LENGTH)?,
            point_batch_ids: batch_ids(ft, POINT_BATCH_IDS),
            batch_length: ft.literal_u32(BATCH_LENGTH)?,
        })
    }

    pub fn set_features(&mut self, features: &VectorFeatures) {
        let ft = &mut self.feature_table;
        ft.set_optional_literal(REGION, features.region.map(|r| Value::from(r.to_vec())));
        ft.set_optional_literal(RTC_CENTER, features.rtc_center.map(dvec3_json));

        ft.set_literal(POLYGONS_LENGTH, Value::from(features.polygons_length));
        ft.set_optional_binary(POLYGON_COUNTS, features.polygon_counts.as_deref().map(BinaryProperty::scalars));
        ft.set_optional_binary(
            POLYGON_INDEX_COUNTS,
            features.polygon_index_counts.as_deref().map(BinaryProperty::scalars),
        );
        ft.set_optional_binary(
            POLYGON_MINIMUM_HEIGHTS,
            features.polygon_minimum_heights.as_deref().map(BinaryProperty::scalars),
        );
        ft.set_optional_binary(
            POLYGON_MAXIMUM_HEIGHTS,
            features.polygon_maximum_heights.as_deref().map(BinaryProperty::scalars),
        );
        ft.set_optional_binary(POLYGON_BATCH_IDS, features.polygon_batch_ids.as_deref().map(short_batch_id_property));

        ft.set_literal(POLYLINES_LENGTH, Value::from(features.polylines_length));
        ft.set_optional_binary(POLYLINE_COUNTS, features.polyline_counts.as_deref().map(BinaryProperty::scalars));
        ft.set_optional_binary(POLYLINE_WIDTHS, features.polyline_widths.as_deref().map(BinaryProperty::scalars));
        ft.set_optional_binary(
            POLYLINE_BATCH_IDS,
            features.polyline_batch_ids.as_deref().map(short_batch_id_property),
        );

        ft.set_literal(POINTS_LENGTH, Value::from(features.points_length));
        ft.set_optional_binary(POINT_BATCH_IDS, features.point_batch_ids.as_deref().map(short_batch_id_property));
        ft.set_optional_literal(BATCH_LENGTH, features.batch_length.map(Value::from));
    }

    fn encode_geometry(&self) -> GeometrySections {
        let mut polygon_indices = vec![0u8; self.polygon_indices.len() * 4];
        TileByteOrder::write_u32_into(&self.polygon_indices, &mut polygon_indices);
        GeometrySections {
            polygon_indices,
            polygon_positions: u16_bytes(&encode_positions2(&self.polygon_positions)),
            polyline_positions: u16_bytes(&encode_positions3(&self.polyline_positions)),
            point_positions: u16_bytes(&encode_positions3(&self.point_positions)),
        }
    }

    fn decode_geometry(&mut self, sections: GeometrySections) -> Result<()> {
        if sections.polygon_indices.len() % 4 != 0 {
            return Err(Error::invalid(format!(
                "polygon indices length {} is not a multiple of 4",
                sections.polygon_indices.len()
            )));
        }
        self.polygon_indices = vec![0u32; sections.polygon_indices.len() / 4];
        TileByteOrder::read_u32_into(&sections.polygon_indices, &mut self.polygon_indices);

        self.polygon_positions = match u16_planes(&sections.polygon_positions, 2, "polygon positions")?.as_slice() {
            [u, v] => decode_positions2(u, v),
            _ => Vec::new(),
        };
        self.polyline_positions = match u16_planes(&sections.polyline_positions, 3, "polyline positions")?.as_slice() {
            [u, v, h] => decode_positions3(u, v, h),
            _ => Vec::new(),
        };
        self.point_positions = match u16_planes(&sections.point_positions, 3, "point positions")?.as_slice() {
            [u, v, h] => decode_positions3(u, v, h),
            _ => Vec::new(),
        };
        Ok(())
    }

    fn encode_tables(&self) -> Result<EncodedTables> {
        EncodedTables::encode(&self.feature_table, &self.batch_table, VctrHeader::SIZE)
    }
}

impl TileModel for Vctr {
    fn format(&self) -> TileFormat {
        TileFormat::Vctr
    }

    fn version(&self) -> u32 {
        self.header.base.version
    }

    fn byte_length(&self) -> u32 {
        self.header.base.byte_length
    }

    fn calc_size(&self) -> Result<u64> {
        let offset = VctrHeader::SIZE + self.encode_tables()?.len();
        Ok((offset + padded_payload_len(self.encode_geometry().len(), offset)) as u64)
    }

    fn read(&mut self, reader: &mut dyn Read) -> Result<()> {
        let header = VctrHeader::read::<TileByteOrder>(reader)?;
        let sections = TableSections::read(reader, &header)?;
        self.feature_table.read(&sections.feature_json, &sections.feature_binary)?;
        let batch_length = self.batch_length()?;
        self.batch_table.read(&sections.batch_json, &sections.batch_binary, batch_length)?;

        let geometry = GeometrySections {
            polygon_indices: read_bytes(reader, header.polygon_indices_byte_length.into(), "polygon indices")?,
            polygon_positions: read_bytes(reader, header.polygon_positions_byte_length.into(), "polygon positions")?,
            polyline_positions: read_bytes(reader, header.polyline_positions_byte_length.into(), "polyline positions")?,
            point_positions: read_bytes(reader, header.point_positions_byte_length.into(), "point positions")?,
        };
        self.decode_geometry(geometry)?;

        let consumed = VctrHeader::SIZE as u64 + header.table_sections_len() + header.geometry_sections_len();
        let trailing = payload_len(header.base.byte_length, consumed)?;
        if trailing >= SECTION_ALIGNMENT as u64 {
            return Err(Error::SizeMismatch { declared: header.base.byte_length.into(), actual: consumed });
        }
        read_bytes(reader, trailing, "vctr padding")?;

        self.header = header;
        tracing::debug!(
            byte_length = header.base.byte_length,
            polygons = self.polygon_positions.len(),
            polylines = self.polyline_positions.len(),
            points = self.point_positions.len(),
            "read vctr"
        );
        Ok(())
    }

    fn write(&mut self, writer: &mut dyn Write) -> Result<()> {
        let tables = self.encode_tables()?;
        let geometry = self.encode_geometry();
        let offset = VctrHeader::SIZE + tables.len();
        let padding = padded_payload(&[], offset + geometry.len(), BINARY_PADDING);
        let total = offset + geometry.len() + padding.len();

        self.header.base.byte_length = to_u32(total, "vctr tile")?;
        self.header.stamp_tables(&tables.feature, &tables.batch)?;
        self.header.polygon_indices_byte_length = to_u32(geometry.polygon_indices.len(), "polygon indices")?;
        self.header.polygon_positions_byte_length = to_u32(geometry.polygon_positions.len(), "polygon positions")?;
        self.header.polyline_positions_byte_length = to_u32(geometry.polyline_positions.len(), "polyline positions")?;
        self.header.point_positions_byte_length = to_u32(geometry.point_positions.len(), "point positions")?;

        let mut out = TileWriter::new(writer);
        self.header.write::<TileByteOrder>(&mut out)?;
        tables.write(&mut out)?;
        out.write_bytes(&geometry.polygon_indices)?;
        out.write_bytes(&geometry.polygon_positions)?;
        out.write_bytes(&geometry.polyline_positions)?;
        out.write_bytes(&geometry.point_positions)?;
        out.write_bytes(&padding)?;
        out.finish(total as u64)?;

        tables.install(&mut self.feature_table, &mut self.batch_table);
        tracing::debug!(byte_length = total, "wrote vctr");
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
