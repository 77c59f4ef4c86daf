//! Analytic geometry tiles (`geom`).
//!
//! Boxes, cylinders and ellipsoids are stored as 4x4 column-major float
//! matrices (16 floats each), spheres as center plus radius (4 floats).
//! Each kind has a parallel batch id array. There is no trailing payload.

use std::any::Any;
use std::io::{Read, Write};

use serde_json::Value;

use super::header::{SectionLengths, TileByteOrder, TileFormat, TileHeader, GEOM_MAGIC};
use super::model::{
    batch_ids, elements, max_id_count, payload_len, short_batch_id_property, EncodedTables, TableSections, TileModel,
    BATCH_ID_COMPONENTS, FLOAT_COMPONENTS,
};
use super::names::*;
use super::stream::TileWriter;
use crate::table::{
    dvec3_json, BatchTable, BinaryProperty, ContainerType, FeatureTable, SemanticCodec, SemanticProperty,
    TableAccess,
};
use crate::util::{to_u32, DVec3, Error, Result};

/// Floats per box, cylinder or ellipsoid.
pub const MATRIX_FLOATS: usize = 16;
/// Floats per sphere.
pub const SPHERE_FLOATS: usize = 4;

static GEOM_PROPERTIES: [SemanticProperty; 9] = [
    SemanticProperty::new(BOXES, FLOAT_COMPONENTS, ContainerType::Scalar, &[BOXES_LENGTH]).per_item(MATRIX_FLOATS),
    SemanticProperty::new(BOX_BATCH_IDS, BATCH_ID_COMPONENTS, ContainerType::Scalar, &[BOXES_LENGTH]),
    SemanticProperty::new(CYLINDERS, FLOAT_COMPONENTS, ContainerType::Scalar, &[CYLINDERS_LENGTH])
        .per_item(MATRIX_FLOATS),
    SemanticProperty::new(CYLINDER_BATCH_IDS, BATCH_ID_COMPONENTS, ContainerType::Scalar, &[CYLINDERS_LENGTH]),
    SemanticProperty::new(ELLIPSOIDS, FLOAT_COMPONENTS, ContainerType::Scalar, &[ELLIPSOIDS_LENGTH])
        .per_item(MATRIX_FLOATS),
    SemanticProperty::new(ELLIPSOID_BATCH_IDS, BATCH_ID_COMPONENTS, ContainerType::Scalar, &[ELLIPSOIDS_LENGTH]),
    SemanticProperty::new(SPHERES, FLOAT_COMPONENTS, ContainerType::Scalar, &[SPHERES_LENGTH]).per_item(SPHERE_FLOATS),
    SemanticProperty::new(SPHERE_BATCH_IDS, BATCH_ID_COMPONENTS, ContainerType::Scalar, &[SPHERES_LENGTH]),
    SemanticProperty::new(RTC_CENTER, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
];

pub static GEOM_FEATURE_TABLE: SemanticCodec = SemanticCodec::new(&GEOM_PROPERTIES, &[]);

/// Typed view of a geom feature table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometryFeatures {
    pub boxes: Vec<[f32; MATRIX_FLOATS]>,
    pub box_batch_ids: Option<Vec<u32>>,
    pub cylinders: Vec<[f32; MATRIX_FLOATS]>,
    pub cylinder_batch_ids: Option<Vec<u32>>,
    pub ellipsoids: Vec<[f32; MATRIX_FLOATS]>,
    pub ellipsoid_batch_ids: Option<Vec<u32>>,
    pub spheres: Vec<[f32; SPHERE_FLOATS]>,
    pub sphere_batch_ids: Option<Vec<u32>>,
    pub batch_length: Option<u32>,
    pub rtc_center: Option<DVec3>,
}

/// Flat scalar property of fixed-size float records.
fn flat_floats<const N: usize>(items: &[[f32; N]]) -> BinaryProperty {
    BinaryProperty::scalars(bytemuck::cast_slice::<[f32; N], f32>(items))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Geom {
    pub header: TileHeader,
    pub feature_table: FeatureTable,
    pub batch_table: BatchTable,
}

impl Default for Geom {
    fn default() -> Self {
        Self::new()
    }
}

impl Geom {
    pub fn new() -> Self {
        let mut feature_table = FeatureTable::new(TileFormat::Geom);
        for key in [BOXES_LENGTH, CYLINDERS_LENGTH, ELLIPSOIDS_LENGTH, SPHERES_LENGTH] {
            feature_table.set_literal(key, Value::from(0));
        }
        Self {
            header: TileHeader::new(GEOM_MAGIC),
            feature_table,
            batch_table: BatchTable::new(),
        }
    }

    /// `BATCH_LENGTH`, or the largest batch id of any kind + 1, or 0.
    pub fn batch_length(&self) -> Result<usize> {
        if let Some(n) = self.feature_table.literal_u32(BATCH_LENGTH)? {
            return Ok(n as usize);
        }
        let ft = &self.feature_table;
        Ok([BOX_BATCH_IDS, CYLINDER_BATCH_IDS, ELLIPSOID_BATCH_IDS, SPHERE_BATCH_IDS]
            .into_iter()
            .filter_map(|name| batch_ids(ft, name).as_deref().and_then(max_id_count))
            .max()
            .unwrap_or(0))
    }

    pub fn features(&self) -> Result<GeometryFeatures> {
        let ft = &self.feature_table;
        Ok(GeometryFeatures {
            boxes: elements(ft, BOXES).unwrap_or_default(),
            box_batch_ids: batch_ids(ft, BOX_BATCH_IDS),
            cylinders: elements(ft, CYLINDERS).unwrap_or_default(),
            cylinder_batch_ids: batch_ids(ft, CYLINDER_BATCH_IDS),
            ellipsoids: elements(ft, ELLIPSOIDS).unwrap_or_default(),
            ellipsoid_batch_ids: batch_ids(ft, ELLIPSOID_BATCH_IDS),
            spheres: elements(ft, SPHERES).unwrap_or_default(),
            sphere_batch_ids: batch_ids(ft, SPHERE_BATCH_IDS),
            batch_length: ft.literal_u32(BATCH_LENGTH)?,
            rtc_center: ft.global_dvec3(RTC_CENTER)?,
        })
    }

    /// Replace the feature table contents with `features`. All four
    /// `*_LENGTH` counts are written, zero for an absent kind.
    pub fn set_features(&mut self, features: &GeometryFeatures) {
        let ft = &mut self.feature_table;
        let kinds = [
            (BOXES_LENGTH, BOXES, flat_floats(&features.boxes), features.boxes.len()),
            (CYLINDERS_LENGTH, CYLINDERS, flat_floats(&features.cylinders), features.cylinders.len()),
            (ELLIPSOIDS_LENGTH, ELLIPSOIDS, flat_floats(&features.ellipsoids), features.ellipsoids.len()),
            (SPHERES_LENGTH, SPHERES, flat_floats(&features.spheres), features.spheres.len()),
        ];
        for (length_key, name, values, count) in kinds {
            ft.set_literal(length_key, Value::from(count));
            ft.set_optional_binary(name, (count > 0).then_some(values));
        }

        let ids = [
            (BOX_BATCH_IDS, &features.box_batch_ids),
            (CYLINDER_BATCH_IDS, &features.cylinder_batch_ids),
            (ELLIPSOID_BATCH_IDS, &features.ellipsoid_batch_ids),
            (SPHERE_BATCH_IDS, &features.sphere_batch_ids),
        ];
        for (name, ids) in ids {
            ft.set_optional_binary(name, ids.as_deref().map(short_batch_id_property));
        }

        ft.set_optional_literal(BATCH_LENGTH, features.batch_length.map(Value::from));
        ft.set_optional_literal(RTC_CENTER, features.rtc_center.map(dvec3_json));
    }

    fn encode_tables(&self) -> Result<EncodedTables> {
        EncodedTables::encode(&self.feature_table, &self.batch_table, TileHeader::SIZE)
    }
}

impl TileModel for Geom {
    fn format(&self) -> TileFormat {
        TileFormat::Geom
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
        let header = TileHeader::read::<TileByteOrder>(reader, GEOM_MAGIC)?;
        let sections = TableSections::read(reader, &header)?;
        self.feature_table.read(&sections.feature_json, &sections.feature_binary)?;
        let batch_length = self.batch_length()?;
        self.batch_table.read(&sections.batch_json, &sections.batch_binary, batch_length)?;

        let consumed = TileHeader::SIZE as u64 + header.table_sections_len();
        if payload_len(header.byte_length, consumed)? != 0 {
            return Err(Error::SizeMismatch { declared: header.byte_length.into(), actual: consumed });
        }
        self.header = header;
        tracing::debug!(byte_length = header.byte_length, batch_length, "read geom");
        Ok(())
    }

    fn write(&mut self, writer: &mut dyn Write) -> Result<()> {
        let tables = self.encode_tables()?;
        let total = TileHeader::SIZE + tables.len();

        self.header.byte_length = to_u32(total, "geom tile")?;
        self.header.stamp_tables(&tables.feature, &tables.batch)?;

        let mut out = TileWriter::new(writer);
        self.header.write::<TileByteOrder>(&mut out)?;
        tables.write(&mut out)?;
        out.finish(total as u64)?;

        tables.install(&mut self.feature_table, &mut self.batch_table);
        tracing::debug!(byte_length = total, "wrote geom");
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
