//! Instanced 3D model tiles (`i3dm`).
//!
//! Layout: [`I3dmHeader`], feature table, batch table, then the instanced
//! model, either as a URI or as an embedded binary glTF depending on the
//! header's `gltfFormat`. Both forms are padded with spaces to end the tile
//! on an 8-byte boundary.

use std::any::Any;
use std::io::{Read, Write};

use serde_json::Value;

use super::gltf::trim_glb;
use super::header::{I3dmHeader, SectionLengths, TileByteOrder, TileFormat};
use super::model::{
    batch_ids, elements, max_id_count, padded_payload, padded_payload_len, payload_len, scalars, world_positions,
    EncodedTables, TableSections, TileModel, BATCH_ID_COMPONENTS, FLOAT_COMPONENTS, UNSIGNED_SHORT_COMPONENTS,
};
use super::names::*;
use super::stream::TileWriter;
use crate::encoding::oct_decode_u16;
use crate::table::{
    batch_id_property, dvec3_json, BatchTable, BinaryProperty, ContainerType, FeatureTable, SemanticCodec,
    SemanticProperty, TableAccess,
};
use crate::util::{read_bytes, to_u32, trim_padding, DVec3, Error, Result, Vec3, JSON_PADDING};

/// `gltfFormat` of a URI payload.
pub const GLTF_FORMAT_URI: u32 = 0;
/// `gltfFormat` of an embedded binary glTF payload.
pub const GLTF_FORMAT_EMBEDDED: u32 = 1;

const INSTANCE_COUNT: &[&str] = &[INSTANCES_LENGTH];

static I3DM_PROPERTIES: [SemanticProperty; 12] = [
    SemanticProperty::new(POSITION, FLOAT_COMPONENTS, ContainerType::Vec3, INSTANCE_COUNT),
    SemanticProperty::new(POSITION_QUANTIZED, UNSIGNED_SHORT_COMPONENTS, ContainerType::Vec3, INSTANCE_COUNT),
    SemanticProperty::new(NORMAL_UP, FLOAT_COMPONENTS, ContainerType::Vec3, INSTANCE_COUNT),
    SemanticProperty::new(NORMAL_RIGHT, FLOAT_COMPONENTS, ContainerType::Vec3, INSTANCE_COUNT),
    SemanticProperty::new(NORMAL_UP_OCT32P, UNSIGNED_SHORT_COMPONENTS, ContainerType::Vec2, INSTANCE_COUNT),
    SemanticProperty::new(NORMAL_RIGHT_OCT32P, UNSIGNED_SHORT_COMPONENTS, ContainerType::Vec2, INSTANCE_COUNT),
    SemanticProperty::new(SCALE, FLOAT_COMPONENTS, ContainerType::Scalar, INSTANCE_COUNT),
    SemanticProperty::new(SCALE_NON_UNIFORM, FLOAT_COMPONENTS, ContainerType::Vec3, INSTANCE_COUNT),
    SemanticProperty::new(BATCH_ID, BATCH_ID_COMPONENTS, ContainerType::Scalar, INSTANCE_COUNT),
    SemanticProperty::new(RTC_CENTER, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
    SemanticProperty::new(QUANTIZED_VOLUME_OFFSET, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
    SemanticProperty::new(QUANTIZED_VOLUME_SCALE, FLOAT_COMPONENTS, ContainerType::Vec3, &[]),
];

pub static I3DM_FEATURE_TABLE: SemanticCodec = SemanticCodec::new(&I3DM_PROPERTIES, INSTANCE_COUNT);

/// The model every instance refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum InstancedModel {
    /// External glTF, padding stripped.
    Uri(String),
    /// Binary glTF as stored, including trailing padding.
    Embedded(Vec<u8>),
}

impl InstancedModel {
    pub fn gltf_format(&self) -> u32 {
        match self {
            Self::Uri(_) => GLTF_FORMAT_URI,
            Self::Embedded(_) => GLTF_FORMAT_EMBEDDED,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Uri(uri) => uri.as_bytes(),
            Self::Embedded(glb) => glb,
        }
    }
}

impl Default for InstancedModel {
    fn default() -> Self {
        Self::Embedded(Vec::new())
    }
}

/// Typed view of an i3dm feature table. Absent properties are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceFeatures {
    pub instances_length: u32,
    pub position: Option<Vec<[f32; 3]>>,
    pub position_quantized: Option<Vec<[u16; 3]>>,
    pub normal_up: Option<Vec<[f32; 3]>>,
    pub normal_right: Option<Vec<[f32; 3]>>,
    pub normal_up_oct32p: Option<Vec<[u16; 2]>>,
    pub normal_right_oct32p: Option<Vec<[u16; 2]>>,
    pub scale: Option<Vec<f32>>,
    pub scale_non_uniform: Option<Vec<[f32; 3]>>,
    pub batch_id: Option<Vec<u32>>,
    pub rtc_center: Option<DVec3>,
    pub quantized_volume_offset: Option<DVec3>,
    pub quantized_volume_scale: Option<DVec3>,
    pub east_north_up: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct I3dm {
    pub header: I3dmHeader,
    pub feature_table: FeatureTable,
    pub batch_table: BatchTable,
    pub model: InstancedModel,
    /// Byte used to pad a URI payload: space, or NUL when the tile read used NUL.
    pub uri_padding: u8,
}

impl Default for I3dm {
    fn default() -> Self {
        Self::new()
    }
}

impl I3dm {
    pub fn new() -> Self {
        let mut feature_table = FeatureTable::new(TileFormat::I3dm);
        feature_table.set_literal(INSTANCES_LENGTH, Value::from(0));
        Self {
            header: I3dmHeader::new(),
            feature_table,
            batch_table: BatchTable::new(),
            model: InstancedModel::default(),
            uri_padding: JSON_PADDING,
        }
    }

    pub fn instances_length(&self) -> Result<usize> {
        Ok(self.feature_table.literal_u32(INSTANCES_LENGTH)?.unwrap_or(0) as usize)
    }

    /// Rows of the batch table: the largest `BATCH_ID` + 1, or one row per
    /// instance without batch ids.
    pub fn batch_length(&self) -> Result<usize> {
        match batch_ids(&self.feature_table, BATCH_ID).as_deref().and_then(max_id_count) {
            Some(n) => Ok(n),
            None => self.instances_length(),
        }
    }

    pub fn features(&self) -> Result<InstanceFeatures> {
        let ft = &self.feature_table;
        Ok(InstanceFeatures {
            instances_length: ft.literal_u32(INSTANCES_LENGTH)?.unwrap_or(0),
            position: elements(ft, POSITION),
            position_quantized: elements(ft, POSITION_QUANTIZED),
            normal_up: elements(ft, NORMAL_UP),
            normal_right: elements(ft, NORMAL_RIGHT),
            normal_up_oct32p: elements(ft, NORMAL_UP_OCT32P),
            normal_right_oct32p: elements(ft, NORMAL_RIGHT_OCT32P),
            scale: scalars(ft, SCALE),
            scale_non_uniform: elements(ft, SCALE_NON_UNIFORM),
            batch_id: batch_ids(ft, BATCH_ID),
            rtc_center: ft.global_dvec3(RTC_CENTER)?,
            quantized_volume_offset: ft.global_dvec3(QUANTIZED_VOLUME_OFFSET)?,
            quantized_volume_scale: ft.global_dvec3(QUANTIZED_VOLUME_SCALE)?,
            east_north_up: ft.literal_bool(EAST_NORTH_UP)?,
        })
    }

    /// Replace the feature table contents with `features`. Batch ids are
    /// stored in the narrowest width holding the largest id.
    pub fn set_features(&mut self, features: &InstanceFeatures) {
        let ft = &mut self.feature_table;
        ft.set_literal(INSTANCES_LENGTH, Value::from(features.instances_length));
        ft.set_optional_binary(POSITION, features.position.as_deref().map(BinaryProperty::vectors));
        ft.set_optional_binary(POSITION_QUANTIZED, features.position_quantized.as_deref().map(BinaryProperty::vectors));
        ft.set_optional_binary(NORMAL_UP, features.normal_up.as_deref().map(BinaryProperty::vectors));
        ft.set_optional_binary(NORMAL_RIGHT, features.normal_right.as_deref().map(BinaryProperty::vectors));
        ft.set_optional_binary(NORMAL_UP_OCT32P, features.normal_up_oct32p.as_deref().map(BinaryProperty::vectors));
        ft.set_optional_binary(
            NORMAL_RIGHT_OCT32P,
            features.normal_right_oct32p.as_deref().map(BinaryProperty::vectors),
        );
        ft.set_optional_binary(SCALE, features.scale.as_deref().map(BinaryProperty::scalars));
        ft.set_optional_binary(SCALE_NON_UNIFORM, features.scale_non_uniform.as_deref().map(BinaryProperty::vectors));
        ft.set_optional_binary(BATCH_ID, features.batch_id.as_deref().map(batch_id_property));
        ft.set_optional_literal(RTC_CENTER, features.rtc_center.map(dvec3_json));
        ft.set_optional_literal(QUANTIZED_VOLUME_OFFSET, features.quantized_volume_offset.map(dvec3_json));
        ft.set_optional_literal(QUANTIZED_VOLUME_SCALE, features.quantized_volume_scale.map(dvec3_json));
        ft.set_optional_literal(EAST_NORTH_UP, features.east_north_up.map(Value::Bool));
    }

    /// Instance positions in tile space.
    pub fn world_positions(&self) -> Result<Vec<DVec3>> {
        world_positions(&self.feature_table)
    }

    /// Per-instance up vectors, decoding the oct-encoded form if needed.
    /// Empty when the tile leaves orientation to the default.
    pub fn up_normals(&self) -> Vec<Vec3> {
        self.normals(NORMAL_UP, NORMAL_UP_OCT32P)
    }

    pub fn right_normals(&self) -> Vec<Vec3> {
        self.normals(NORMAL_RIGHT, NORMAL_RIGHT_OCT32P)
    }

    fn normals(&self, plain: &str, oct: &str) -> Vec<Vec3> {
        if let Some(n) = self.feature_table.binary(plain).and_then(BinaryProperty::to_vec3) {
            return n;
        }
        elements::<u16, 2>(&self.feature_table, oct)
            .map(|e| e.into_iter().map(oct_decode_u16).collect())
            .unwrap_or_default()
    }

    /// The embedded model with padding stripped; `None` for a URI payload.
    pub fn embedded_glb(&self) -> Option<&[u8]> {
        match &self.model {
            InstancedModel::Embedded(glb) => Some(trim_glb(glb)),
            InstancedModel::Uri(_) => None,
        }
    }

    fn encode_tables(&self) -> Result<EncodedTables> {
        EncodedTables::encode(&self.feature_table, &self.batch_table, I3dmHeader::SIZE)
    }
}

impl TileModel for I3dm {
    fn format(&self) -> TileFormat {
        TileFormat::I3dm
    }

    fn version(&self) -> u32 {
        self.header.base.version
    }

    fn byte_length(&self) -> u32 {
        self.header.base.byte_length
    }

    fn calc_size(&self) -> Result<u64> {
        let offset = I3dmHeader::SIZE + self.encode_tables()?.len();
        Ok((offset + padded_payload_len(self.model.bytes().len(), offset)) as u64)
    }

    fn read(&mut self, reader: &mut dyn Read) -> Result<()> {
        let header = I3dmHeader::read::<TileByteOrder>(reader)?;
        if header.gltf_format > GLTF_FORMAT_EMBEDDED {
            return Err(Error::invalid(format!("unsupported i3dm gltfFormat {}", header.gltf_format)));
        }
        let sections = TableSections::read(reader, &header)?;
        self.feature_table.read(&sections.feature_json, &sections.feature_binary)?;
        let batch_length = self.batch_length()?;
        self.batch_table.read(&sections.batch_json, &sections.batch_binary, batch_length)?;

        let remaining = payload_len(header.base.byte_length, I3dmHeader::SIZE as u64 + header.table_sections_len())?;
        let payload = read_bytes(reader, remaining, "i3dm glTF")?;
        self.model = if header.gltf_format == GLTF_FORMAT_URI {
            let uri = trim_padding(&payload);
            self.uri_padding = payload.get(uri.len()).copied().unwrap_or(JSON_PADDING);
            InstancedModel::Uri(String::from_utf8(uri.to_vec())?)
        } else {
            InstancedModel::Embedded(payload)
        };
        self.header = header;
        tracing::debug!(
            byte_length = header.base.byte_length,
            gltf_format = header.gltf_format,
            batch_length,
            "read i3dm"
        );
        Ok(())
    }

    fn write(&mut self, writer: &mut dyn Write) -> Result<()> {
        let tables = self.encode_tables()?;
        let offset = I3dmHeader::SIZE + tables.len();
        let fill = match self.model {
            InstancedModel::Uri(_) => self.uri_padding,
            InstancedModel::Embedded(_) => JSON_PADDING,
        };
        let payload = padded_payload(self.model.bytes(), offset, fill);
        let total = offset + payload.len();

        self.header.base.byte_length = to_u32(total, "i3dm tile")?;
        self.header.gltf_format = self.model.gltf_format();
        self.header.stamp_tables(&tables.feature, &tables.batch)?;

        let mut out = TileWriter::new(writer);
        self.header.write::<TileByteOrder>(&mut out)?;
        tables.write(&mut out)?;
        out.write_bytes(&payload)?;
        out.finish(total as u64)?;

        tables.install(&mut self.feature_table, &mut self.batch_table);
        tracing::debug!(byte_length = total, "wrote i3dm");
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
