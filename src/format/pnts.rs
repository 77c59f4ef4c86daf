//! Point cloud tiles (`pnts`).
//!
//! Layout: [`TileHeader`], feature table, batch table. The feature table
//! carries all point data; there is no trailing payload.

use std::any::Any;
use std::io::{Read, Write};

use serde_json::Value;

use super::header::{SectionLengths, TileByteOrder, TileFormat, TileHeader, PNTS_MAGIC};
use super::model::{
    batch_ids, elements, payload_len, scalars, world_positions, EncodedTables, TableSections, TileModel,
    BATCH_ID_COMPONENTS, FLOAT_COMPONENTS, UNSIGNED_BYTE_COMPONENTS, UNSIGNED_SHORT_COMPONENTS,
};
use super::names::*;
use super::stream::TileWriter;
use crate::encoding::{oct_decode_bytes, rgb565_decode, QuantizationParams};
use crate::table::{
    batch_id_property, dvec3_json, literal_count, BatchTable, BinaryProperty, ComponentType, ContainerType,
    FeatureTable, SemanticCodec, SemanticProperty, TableAccess,
};
use crate::util::{to_u32, DVec3, Error, Result, Vec3};

const POINT_COUNT: &[&str] = &[POINTS_LENGTH, POSITION_LENGTH];

static PNTS_PROPERTIES: [SemanticProperty; 12] = [
    SemanticProperty::new(
        POSITION,
        &[ComponentType::Float, ComponentType::Double],
        ContainerType::Vec3,
        POINT_COUNT,
    ),
    SemanticProperty::new(POSITION_QUANTIZED, UNSIGNED_SHORT_COMPONENTS, ContainerType::Vec3, POINT_COUNT),
    SemanticProperty::new(RGBA, UNSIGNED_BYTE_COMPONENTS, ContainerType::Vec4, POINT_COUNT),
    SemanticProperty::new(RGB, UNSIGNED_BYTE_COMPONENTS, ContainerType::Vec3, POINT_COUNT),
    SemanticProperty::new(RGB565, UNSIGNED_SHORT_COMPONENTS, ContainerType::Scalar, POINT_COUNT),
    SemanticProperty::new(NORMAL, FLOAT_COMPONENTS, ContainerType::Vec3, POINT_COUNT),
    SemanticProperty::new(NORMAL_OCT16P, UNSIGNED_BYTE_COMPONENTS, ContainerType::Vec2, POINT_COUNT),
    SemanticProperty::new(BATCH_ID, BATCH_ID_COMPONENTS, ContainerType::Scalar, POINT_COUNT),
    SemanticProperty::new(RTC_CENTER, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
    SemanticProperty::new(QUANTIZED_VOLUME_OFFSET, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
    SemanticProperty::new(QUANTIZED_VOLUME_SCALE, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
    SemanticProperty::new(CONSTANT_RGBA, UNSIGNED_BYTE_COMPONENTS, ContainerType::Vec4, &[]),
];

pub static PNTS_FEATURE_TABLE: SemanticCodec = SemanticCodec::new(&PNTS_PROPERTIES, POINT_COUNT);

/// Point positions in one of their storage forms.
#[derive(Clone, Debug, PartialEq)]
pub enum PointPositions {
    Float(Vec<[f32; 3]>),
    Double(Vec<[f64; 3]>),
    /// 16-bit positions inside the volume `offset..offset + scale`.
    Quantized { positions: Vec<[u16; 3]>, offset: DVec3, scale: DVec3 },
}

impl PointPositions {
    /// Quantize `points` into their tightest bounding volume.
    pub fn quantize(points: &[DVec3]) -> Self {
        let params = QuantizationParams::from_points(points)
            .unwrap_or_else(|| QuantizationParams::from_volume(DVec3::ZERO, DVec3::ZERO));
        Self::Quantized {
            positions: points.iter().map(|&p| params.quantize_point(p)).collect(),
            offset: params.volume_offset(),
            scale: params.volume_scale(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float(p) => p.len(),
            Self::Double(p) => p.len(),
            Self::Quantized { positions, .. } => positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The color form of a point cloud; the forms are mutually exclusive.
#[derive(Clone, Debug, PartialEq)]
pub enum PointColor {
    Rgba(Vec<[u8; 4]>),
    Rgb(Vec<[u8; 3]>),
    Rgb565(Vec<u16>),
    /// One color for every point.
    Constant([u8; 4]),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PointNormals {
    Float(Vec<[f32; 3]>),
    Oct16P(Vec<[u8; 2]>),
}

/// Typed view of a pnts feature table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointFeatures {
    pub points_length: u32,
    pub positions: Option<PointPositions>,
    pub color: Option<PointColor>,
    pub normals: Option<PointNormals>,
    pub batch_id: Option<Vec<u32>>,
    pub batch_length: Option<u32>,
    pub rtc_center: Option<DVec3>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pnts {
    pub header: TileHeader,
    pub feature_table: FeatureTable,
    pub batch_table: BatchTable,
}

impl Default for Pnts {
    fn default() -> Self {
        Self::new()
    }
}

impl Pnts {
    pub fn new() -> Self {
        let mut feature_table = FeatureTable::new(TileFormat::Pnts);
        feature_table.set_literal(POINTS_LENGTH, Value::from(0));
        Self {
            header: TileHeader::new(PNTS_MAGIC),
            feature_table,
            batch_table: BatchTable::new(),
        }
    }

    /// Number of points, from `POINTS_LENGTH` or its older spelling.
    pub fn points_length(&self) -> Result<usize> {
        Ok(literal_count(&self.feature_table.header, POINT_COUNT)?.unwrap_or(0))
    }

    /// Rows of the batch table: `BATCH_LENGTH` when points are batched,
    /// one row per point otherwise.
    pub fn batch_length(&self) -> Result<usize> {
        match self.feature_table.literal_u32(BATCH_LENGTH)? {
            Some(n) => Ok(n as usize),
            None => self.points_length(),
        }
    }

    pub fn features(&self) -> Result<PointFeatures> {
        let ft = &self.feature_table;

        let positions = if let Some(p) = elements::<f32, 3>(ft, POSITION) {
            Some(PointPositions::Float(p))
        } else if let Some(p) = elements::<f64, 3>(ft, POSITION) {
            Some(PointPositions::Double(p))
        } else if let Some(positions) = elements::<u16, 3>(ft, POSITION_QUANTIZED) {
            let offset = ft.global_dvec3(QUANTIZED_VOLUME_OFFSET)?;
            let scale = ft.global_dvec3(QUANTIZED_VOLUME_SCALE)?;
            let (Some(offset), Some(scale)) = (offset, scale) else {
                return Err(Error::schema(format!(
                    "{POSITION_QUANTIZED} requires {QUANTIZED_VOLUME_OFFSET} and {QUANTIZED_VOLUME_SCALE}"
                )));
            };
            Some(PointPositions::Quantized { positions, offset, scale })
        } else {
            None
        };

        let color = if let Some(c) = elements(ft, RGBA) {
            Some(PointColor::Rgba(c))
        } else if let Some(c) = elements(ft, RGB) {
            Some(PointColor::Rgb(c))
        } else if let Some(c) = scalars(ft, RGB565) {
            Some(PointColor::Rgb565(c))
        } else {
            self.constant_rgba()?.map(PointColor::Constant)
        };

        let normals = if let Some(n) = elements(ft, NORMAL) {
            Some(PointNormals::Float(n))
        } else {
            elements(ft, NORMAL_OCT16P).map(PointNormals::Oct16P)
        };

        Ok(PointFeatures {
            points_length: to_u32(self.points_length()?, POINTS_LENGTH)?,
            positions,
            color,
            normals,
            batch_id: batch_ids(ft, BATCH_ID),
            batch_length: ft.literal_u32(BATCH_LENGTH)?,
            rtc_center: ft.global_dvec3(RTC_CENTER)?,
        })
    }

    /// Replace the feature table contents with `features`. The point count
    /// is written as `POINTS_LENGTH`.
    pub fn set_features(&mut self, features: &PointFeatures) {
        let ft = &mut self.feature_table;
        for name in [
            POSITION_LENGTH,
            POSITION,
            POSITION_QUANTIZED,
            QUANTIZED_VOLUME_OFFSET,
            QUANTIZED_VOLUME_SCALE,
            RGBA,
            RGB,
            RGB565,
            CONSTANT_RGBA,
            NORMAL,
            NORMAL_OCT16P,
        ] {
            ft.remove_property(name);
        }
        ft.set_literal(POINTS_LENGTH, Value::from(features.points_length));

        match &features.positions {
            Some(PointPositions::Float(p)) => ft.set_binary(POSITION, BinaryProperty::vectors(p)),
            Some(PointPositions::Double(p)) => ft.set_binary(POSITION, BinaryProperty::vectors(p)),
            Some(PointPositions::Quantized { positions, offset, scale }) => {
                ft.set_binary(POSITION_QUANTIZED, BinaryProperty::vectors(positions));
                ft.set_literal(QUANTIZED_VOLUME_OFFSET, dvec3_json(*offset));
                ft.set_literal(QUANTIZED_VOLUME_SCALE, dvec3_json(*scale));
            }
            None => {}
        }

        match &features.color {
            Some(PointColor::Rgba(c)) => ft.set_binary(RGBA, BinaryProperty::vectors(c)),
            Some(PointColor::Rgb(c)) => ft.set_binary(RGB, BinaryProperty::vectors(c)),
            Some(PointColor::Rgb565(c)) => ft.set_binary(RGB565, BinaryProperty::scalars(c)),
            Some(PointColor::Constant(c)) => ft.set_literal(CONSTANT_RGBA, Value::from(c.to_vec())),
            None => {}
        }

        match &features.normals {
            Some(PointNormals::Float(n)) => ft.set_binary(NORMAL, BinaryProperty::vectors(n)),
            Some(PointNormals::Oct16P(n)) => ft.set_binary(NORMAL_OCT16P, BinaryProperty::vectors(n)),
            None => {}
        }

        ft.set_optional_binary(BATCH_ID, features.batch_id.as_deref().map(batch_id_property));
        ft.set_optional_literal(BATCH_LENGTH, features.batch_length.map(Value::from));
        ft.set_optional_literal(RTC_CENTER, features.rtc_center.map(dvec3_json));
    }

    /// Point positions in tile space.
    pub fn world_positions(&self) -> Result<Vec<DVec3>> {
        world_positions(&self.feature_table)
    }

    /// Unit normals per point, decoding the oct-encoded form if needed.
    pub fn normals(&self) -> Vec<Vec3> {
        if let Some(n) = self.feature_table.binary(NORMAL).and_then(BinaryProperty::to_vec3) {
            return n;
        }
        elements::<u8, 2>(&self.feature_table, NORMAL_OCT16P)
            .map(|e| e.into_iter().map(oct_decode_bytes).collect())
            .unwrap_or_default()
    }

    /// One RGBA color per point, whatever the stored form. Empty without colors.
    pub fn colors_rgba(&self) -> Result<Vec<[u8; 4]>> {
        let ft = &self.feature_table;
        let opaque = |[r, g, b]: [u8; 3]| [r, g, b, 255];
        if let Some(c) = elements::<u8, 4>(ft, RGBA) {
            return Ok(c);
        }
        if let Some(c) = elements::<u8, 3>(ft, RGB) {
            return Ok(c.into_iter().map(opaque).collect());
        }
        if let Some(c) = scalars::<u16>(ft, RGB565) {
            return Ok(c.into_iter().map(|v| opaque(rgb565_decode(v))).collect());
        }
        let Some(c) = self.constant_rgba()? else {
            return Ok(Vec::new());
        };
        // Bounded by the positions actually resolved from the body.
        let resolved = [POSITION, POSITION_QUANTIZED]
            .into_iter()
            .filter_map(|name| ft.binary(name))
            .map(|p| p.len())
            .max()
            .unwrap_or(0);
        Ok(vec![c; self.points_length()?.min(resolved)])
    }

    fn constant_rgba(&self) -> Result<Option<[u8; 4]>> {
        let ft = &self.feature_table;
        if let Some(c) = ft.literal_u8s::<4>(CONSTANT_RGBA)? {
            return Ok(Some(c));
        }
        Ok(elements::<u8, 4>(ft, CONSTANT_RGBA).and_then(|c| c.first().copied()))
    }

    fn encode_tables(&self) -> Result<EncodedTables> {
        EncodedTables::encode(&self.feature_table, &self.batch_table, TileHeader::SIZE)
    }
}

impl TileModel for Pnts {
    fn format(&self) -> TileFormat {
        TileFormat::Pnts
    }

    fn version(&self) -> u32 {
        self.header.version
    }

    fn byte_length(&self) -> u32 {
        self.header.byte_length
    }

    fn calc_size(&self) -> Result<u64> {
        Ok((TileHeader::SIZE + self.encode_tables()?.len()) as u64)
    }

    fn read(&mut self, reader: &mut dyn Read) -> Result<()> {
        let header = TileHeader::read::<TileByteOrder>(reader, PNTS_MAGIC)?;
        let sections = TableSections::read(reader, &header)?;
        self.feature_table.read(&sections.feature_json, &sections.feature_binary)?;
        let batch_length = self.batch_length()?;
        self.batch_table.read(&sections.batch_json, &sections.batch_binary, batch_length)?;

        let consumed = TileHeader::SIZE as u64 + header.table_sections_len();
        if payload_len(header.byte_length, consumed)? != 0 {
            return Err(Error::SizeMismatch { declared: header.byte_length.into(), actual: consumed });
        }
        self.header = header;
        tracing::debug!(byte_length = header.byte_length, batch_length, "read pnts");
        Ok(())
    }

    fn write(&mut self, writer: &mut dyn Write) -> Result<()> {
        let tables = self.encode_tables()?;
        let total = TileHeader::SIZE + tables.len();

        self.header.byte_length = to_u32(total, "pnts tile")?;
        self.header.stamp_tables(&tables.feature, &tables.batch)?;

        let mut out = TileWriter::new(writer);
        self.header.write::<TileByteOrder>(&mut out)?;
        tables.write(&mut out)?;
        out.finish(total as u64)?;

        tables.install(&mut self.feature_table, &mut self.batch_table);
        tracing::debug!(byte_length = total, "wrote pnts");
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
    use crate::encoding::oct_encode_bytes;
    use std::io::Cursor;

    #[test]
    fn test_constant_color_bounded_by_positions() {
        let mut tile = Pnts::new();
        tile.feature_table.set_literal(POINTS_LENGTH, Value::from(u32::MAX));
        tile.feature_table.set_literal(CONSTANT_RGBA, serde_json::json!([1, 2, 3, 4]));
        assert!(tile.colors_rgba().unwrap().is_empty());

        tile.feature_table.set_literal(POINTS_LENGTH, Value::from(2));
        tile.feature_table.set_binary(POSITION, BinaryProperty::vectors(&[[0.0f32; 3]; 2]));
        assert_eq!(tile.colors_rgba().unwrap(), vec![[1, 2, 3, 4]; 2]);
    }

    #[test]
    fn test_features_roundtrip() {
        let features = PointFeatures {
            points_length: 2,
            positions: Some(PointPositions::Float(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])),
            color: Some(PointColor::Rgb(vec![[255, 0, 0], [0, 0, 255]])),
            normals: Some(PointNormals::Oct16P(vec![oct_encode_bytes(Vec3::Y); 2])),
            batch_id: Some(vec![1, 0]),
            batch_length: Some(2),
            rtc_center: None,
        };
        let mut tile = Pnts::new();
        tile.set_features(&features);
        tile.batch_table.set_binary("classification", BinaryProperty::scalars(&[3u8, 9]));

        let bytes = tile.to_bytes().unwrap();
        let mut back = Pnts::new();
        back.read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back.features().unwrap(), features);
        assert_eq!(back.colors_rgba().unwrap(), vec![[255, 0, 0, 255], [0, 0, 255, 255]]);
        assert!((back.normals()[1] - Vec3::Y).length() < 1e-2);
        assert_eq!(back.batch_table.get("classification", 1), Some(serde_json::json!(9)));
        assert_eq!(back.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_quantized_positions() {
        let points = [DVec3::new(0.0, 0.0, 0.0), DVec3::new(10.0, 20.0, 0.0), DVec3::new(5.0, 5.0, 0.0)];
        let mut tile = Pnts::new();
        tile.set_features(&PointFeatures {
            points_length: 3,
            positions: Some(PointPositions::quantize(&points)),
            ..Default::default()
        });

        let world = tile.world_positions().unwrap();
        for (a, b) in world.iter().zip(&points) {
            assert!((*a - *b).length() < 20.0 / 65535.0 * 2.0);
        }
        assert_eq!(world[1], DVec3::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_constant_color_and_alias_count() {
        let mut tile = Pnts::new();
        tile.feature_table.remove_property(POINTS_LENGTH);
        tile.feature_table.set_literal(POSITION_LENGTH, Value::from(3));
        tile.feature_table.set_literal(CONSTANT_RGBA, serde_json::json!([1, 2, 3, 4]));
        assert_eq!(tile.points_length().unwrap(), 3);
        assert_eq!(tile.batch_length().unwrap(), 3);
        assert_eq!(tile.colors_rgba().unwrap(), vec![[1, 2, 3, 4]; 3]);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = Pnts::new().to_bytes().unwrap();
        let len = bytes.len() as u32 + 8;
        bytes[8..12].copy_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        let err = Pnts::new().read(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { .. }));
    }
}
