//! Tile format tags, constants and fixed-size headers.
//!
//! Every tile starts with a little-endian header. The b3dm, pnts and geom
//! layout is the 28-byte [`TileHeader`]; i3dm appends a glTF format flag,
//! vctr appends four trailing section lengths, and cmpt uses its own
//! 16-byte header.

use std::fmt;
use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use bytemuck::{Pod, Zeroable};

use crate::table::{EncodedTable, FeatureTableCodec};
use crate::util::{eof_or_io, to_u32, Error, Result};

/// Byte order of every tile format.
pub type TileByteOrder = LittleEndian;

pub const B3DM_MAGIC: [u8; 4] = *b"b3dm";
pub const I3DM_MAGIC: [u8; 4] = *b"i3dm";
pub const PNTS_MAGIC: [u8; 4] = *b"pnts";
pub const GEOM_MAGIC: [u8; 4] = *b"geom";
pub const VCTR_MAGIC: [u8; 4] = *b"vctr";
pub const CMPT_MAGIC: [u8; 4] = *b"cmpt";

/// Version written to every header.
pub const TILE_VERSION: u32 = 1;

/// Size of the magic field.
pub const MAGIC_SIZE: usize = 4;

/// Offset of the version in every header.
pub const VERSION_OFFSET: usize = 4;

/// Offset of the total byte length in every header.
pub const BYTE_LENGTH_OFFSET: usize = 8;

/// Offsets of the four table section lengths in [`TileHeader`].
pub const FEATURE_TABLE_JSON_OFFSET: usize = 12;
pub const FEATURE_TABLE_BINARY_OFFSET: usize = 16;
pub const BATCH_TABLE_JSON_OFFSET: usize = 20;
pub const BATCH_TABLE_BINARY_OFFSET: usize = 24;

/// Offset of the tile count in [`CmptHeader`].
pub const TILES_LENGTH_OFFSET: usize = 12;

/// Tile kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TileFormat {
    /// Batched 3D model
    B3dm,
    /// Instanced 3D model
    I3dm,
    /// Point cloud
    Pnts,
    /// Analytic geometry
    Geom,
    /// Vector data
    Vctr,
    /// Composite of other tiles
    Cmpt,
}

impl TileFormat {
    pub const ALL: [Self; 6] = [Self::B3dm, Self::I3dm, Self::Pnts, Self::Geom, Self::Vctr, Self::Cmpt];

    pub const fn magic(self) -> [u8; 4] {
        match self {
            Self::B3dm => B3DM_MAGIC,
            Self::I3dm => I3DM_MAGIC,
            Self::Pnts => PNTS_MAGIC,
            Self::Geom => GEOM_MAGIC,
            Self::Vctr => VCTR_MAGIC,
            Self::Cmpt => CMPT_MAGIC,
        }
    }

    pub fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|f| &f.magic() == magic)
    }

    /// Fixed header size in bytes.
    pub const fn header_size(self) -> usize {
        match self {
            Self::B3dm | Self::Pnts | Self::Geom => TileHeader::SIZE,
            Self::I3dm => I3dmHeader::SIZE,
            Self::Vctr => VctrHeader::SIZE,
            Self::Cmpt => CmptHeader::SIZE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::B3dm => "b3dm",
            Self::I3dm => "i3dm",
            Self::Pnts => "pnts",
            Self::Geom => "geom",
            Self::Vctr => "vctr",
            Self::Cmpt => "cmpt",
        }
    }

    /// Feature table codec for this format; composites have no feature table.
    pub fn feature_table_codec(self) -> Option<&'static dyn FeatureTableCodec> {
        match self {
            Self::B3dm => Some(&super::b3dm::B3DM_FEATURE_TABLE),
            Self::I3dm => Some(&super::i3dm::I3DM_FEATURE_TABLE),
            Self::Pnts => Some(&super::pnts::PNTS_FEATURE_TABLE),
            Self::Geom => Some(&super::geom::GEOM_FEATURE_TABLE),
            Self::Vctr => Some(&super::vctr::VCTR_FEATURE_TABLE),
            Self::Cmpt => None,
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn check_magic(found: [u8; 4], expected: [u8; 4]) -> Result<()> {
    if found != expected {
        return Err(Error::invalid_magic(&expected, &found));
    }
    Ok(())
}

fn read_fixed<const N: usize>(reader: &mut (impl Read + ?Sized), section: &'static str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| eof_or_io(e, section))?;
    Ok(buf)
}

/// Get/set the four table section lengths shared by the five feature-bearing formats.
pub trait SectionLengths {
    fn tile_header(&self) -> &TileHeader;
    fn tile_header_mut(&mut self) -> &mut TileHeader;

    fn feature_table_json_byte_length(&self) -> u32 {
        self.tile_header().feature_table_json_byte_length
    }
    fn feature_table_binary_byte_length(&self) -> u32 {
        self.tile_header().feature_table_binary_byte_length
    }
    fn batch_table_json_byte_length(&self) -> u32 {
        self.tile_header().batch_table_json_byte_length
    }
    fn batch_table_binary_byte_length(&self) -> u32 {
        self.tile_header().batch_table_binary_byte_length
    }

    fn set_feature_table_json_byte_length(&mut self, n: u32) {
        self.tile_header_mut().feature_table_json_byte_length = n;
    }
    fn set_feature_table_binary_byte_length(&mut self, n: u32) {
        self.tile_header_mut().feature_table_binary_byte_length = n;
    }
    fn set_batch_table_json_byte_length(&mut self, n: u32) {
        self.tile_header_mut().batch_table_json_byte_length = n;
    }
    fn set_batch_table_binary_byte_length(&mut self, n: u32) {
        self.tile_header_mut().batch_table_binary_byte_length = n;
    }

    /// Sum of the four table sections.
    fn table_sections_len(&self) -> u64 {
        u64::from(self.feature_table_json_byte_length())
            + u64::from(self.feature_table_binary_byte_length())
            + u64::from(self.batch_table_json_byte_length())
            + u64::from(self.batch_table_binary_byte_length())
    }

    /// Record the section lengths of freshly encoded tables.
    fn stamp_tables(&mut self, feature: &EncodedTable, batch: &EncodedTable) -> Result<()> {
        self.set_feature_table_json_byte_length(to_u32(feature.json.len(), "feature table JSON")?);
        self.set_feature_table_binary_byte_length(to_u32(feature.binary.len(), "feature table binary")?);
        self.set_batch_table_json_byte_length(to_u32(batch.json.len(), "batch table JSON")?);
        self.set_batch_table_binary_byte_length(to_u32(batch.binary.len(), "batch table binary")?);
        Ok(())
    }
}

/// 28-byte header of b3dm, pnts and geom tiles.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TileHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub byte_length: u32,
    pub feature_table_json_byte_length: u32,
    pub feature_table_binary_byte_length: u32,
    pub batch_table_json_byte_length: u32,
    pub batch_table_binary_byte_length: u32,
}

impl TileHeader {
    pub const SIZE: usize = 28;

    pub fn new(magic: [u8; 4]) -> Self {
        Self { magic, version: TILE_VERSION, ..Self::zeroed() }
    }

    /// Parse from at least [`Self::SIZE`] bytes, checking the magic.
    pub fn parse<B: ByteOrder>(bytes: &[u8], expected: [u8; 4]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::UnexpectedEof("tile header"));
        }
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        check_magic(magic, expected)?;
        Ok(Self {
            magic,
            version: B::read_u32(&bytes[VERSION_OFFSET..]),
            byte_length: B::read_u32(&bytes[BYTE_LENGTH_OFFSET..]),
            feature_table_json_byte_length: B::read_u32(&bytes[FEATURE_TABLE_JSON_OFFSET..]),
            feature_table_binary_byte_length: B::read_u32(&bytes[FEATURE_TABLE_BINARY_OFFSET..]),
            batch_table_json_byte_length: B::read_u32(&bytes[BATCH_TABLE_JSON_OFFSET..]),
            batch_table_binary_byte_length: B::read_u32(&bytes[BATCH_TABLE_BINARY_OFFSET..]),
        })
    }

    pub fn read<B: ByteOrder>(reader: &mut (impl Read + ?Sized), expected: [u8; 4]) -> Result<Self> {
        let buf = read_fixed::<{ TileHeader::SIZE }>(reader, "tile header")?;
        Self::parse::<B>(&buf, expected)
    }

    pub fn write<B: ByteOrder>(&self, writer: &mut (impl Write + ?Sized)) -> Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<B>(self.version)?;
        writer.write_u32::<B>(self.byte_length)?;
        writer.write_u32::<B>(self.feature_table_json_byte_length)?;
        writer.write_u32::<B>(self.feature_table_binary_byte_length)?;
        writer.write_u32::<B>(self.batch_table_json_byte_length)?;
        writer.write_u32::<B>(self.batch_table_binary_byte_length)?;
        Ok(())
    }
}

impl SectionLengths for TileHeader {
    fn tile_header(&self) -> &TileHeader {
        self
    }
    fn tile_header_mut(&mut self) -> &mut TileHeader {
        self
    }
}

/// 32-byte i3dm header: [`TileHeader`] plus the glTF format flag.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct I3dmHeader {
    pub base: TileHeader,
    /// 0: payload is a URI, 1: payload is an embedded binary glTF.
    pub gltf_format: u32,
}

impl I3dmHeader {
    pub const SIZE: usize = 32;

    pub fn new() -> Self {
        Self { base: TileHeader::new(I3DM_MAGIC), gltf_format: 1 }
    }

    pub fn read<B: ByteOrder>(reader: &mut (impl Read + ?Sized)) -> Result<Self> {
        let buf = read_fixed::<{ I3dmHeader::SIZE }>(reader, "i3dm header")?;
        Ok(Self {
            base: TileHeader::parse::<B>(&buf, I3DM_MAGIC)?,
            gltf_format: B::read_u32(&buf[TileHeader::SIZE..]),
        })
    }

    pub fn write<B: ByteOrder>(&self, writer: &mut (impl Write + ?Sized)) -> Result<()> {
        self.base.write::<B>(writer)?;
        writer.write_u32::<B>(self.gltf_format)?;
        Ok(())
    }
}

impl Default for I3dmHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionLengths for I3dmHeader {
    fn tile_header(&self) -> &TileHeader {
        &self.base
    }
    fn tile_header_mut(&mut self) -> &mut TileHeader {
        &mut self.base
    }
}

/// 44-byte vctr header: [`TileHeader`] plus the byte lengths of the
/// polygon indices and the three position sections.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct VctrHeader {
    pub base: TileHeader,
    pub polygon_indices_byte_length: u32,
    pub polygon_positions_byte_length: u32,
    pub polyline_positions_byte_length: u32,
    pub point_positions_byte_length: u32,
}

impl VctrHeader {
    pub const SIZE: usize = 44;

    pub fn new() -> Self {
        Self { base: TileHeader::new(VCTR_MAGIC), ..Self::zeroed() }
    }

    pub fn read<B: ByteOrder>(reader: &mut (impl Read + ?Sized)) -> Result<Self> {
        let buf = read_fixed::<{ VctrHeader::SIZE }>(reader, "vctr header")?;
        let tail = &buf[TileHeader::SIZE..];
        Ok(Self {
            base: TileHeader::parse::<B>(&buf, VCTR_MAGIC)?,
            polygon_indices_byte_length: B::read_u32(&tail[0..]),
            polygon_positions_byte_length: B::read_u32(&tail[4..]),
            polyline_positions_byte_length: B::read_u32(&tail[8..]),
            point_positions_byte_length: B::read_u32(&tail[12..]),
        })
    }

    pub fn write<B: ByteOrder>(&self, writer: &mut (impl Write + ?Sized)) -> Result<()> {
        self.base.write::<B>(writer)?;
        writer.write_u32::<B>(self.polygon_indices_byte_length)?;
        writer.write_u32::<B>(self.polygon_positions_byte_length)?;
        writer.write_u32::<B>(self.polyline_positions_byte_length)?;
        writer.write_u32::<B>(self.point_positions_byte_length)?;
        Ok(())
    }

    /// Sum of the four trailing geometry sections.
    pub fn geometry_sections_len(&self) -> u64 {
        u64::from(self.polygon_indices_byte_length)
            + u64::from(self.polygon_positions_byte_length)
            + u64::from(self.polyline_positions_byte_length)
            + u64::from(self.point_positions_byte_length)
    }
}

impl Default for VctrHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionLengths for VctrHeader {
    fn tile_header(&self) -> &TileHeader {
        &self.base
    }
    fn tile_header_mut(&mut self) -> &mut TileHeader {
        &mut self.base
    }
}

/// 16-byte composite header.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct CmptHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub byte_length: u32,
    pub tiles_length: u32,
}

impl CmptHeader {
    pub const SIZE: usize = 16;

    pub fn new() -> Self {
        Self { magic: CMPT_MAGIC, version: TILE_VERSION, byte_length: 0, tiles_length: 0 }
    }

    pub fn read<B: ByteOrder>(reader: &mut (impl Read + ?Sized)) -> Result<Self> {
        let buf = read_fixed::<{ CmptHeader::SIZE }>(reader, "cmpt header")?;
        let magic = [buf[0], buf[1], buf[2], buf[3]];
        check_magic(magic, CMPT_MAGIC)?;
        Ok(Self {
            magic,
            version: B::read_u32(&buf[VERSION_OFFSET..]),
            byte_length: B::read_u32(&buf[BYTE_LENGTH_OFFSET..]),
            tiles_length: B::read_u32(&buf[TILES_LENGTH_OFFSET..]),
        })
    }

    pub fn write<B: ByteOrder>(&self, writer: &mut (impl Write + ?Sized)) -> Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<B>(self.version)?;
        writer.write_u32::<B>(self.byte_length)?;
        writer.write_u32::<B>(self.tiles_length)?;
        Ok(())
    }
}

impl Default for CmptHeader {
    fn default() -> Self {
        Self::new()
    }
}

const _: () = assert!(std::mem::size_of::<TileHeader>() == TileHeader::SIZE);
const _: () = assert!(std::mem::size_of::<I3dmHeader>() == I3dmHeader::SIZE);
const _: () = assert!(std::mem::size_of::<VctrHeader>() == VctrHeader::SIZE);
const _: () = assert!(std::mem::size_of::<CmptHeader>() == CmptHeader::SIZE);
const _: () = assert!(MAGIC_SIZE == VERSION_OFFSET);
