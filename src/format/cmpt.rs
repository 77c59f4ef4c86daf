//! Composite tiles (`cmpt`).
//!
//! A 16-byte [`CmptHeader`] followed by `tilesLength` inner tiles, each
//! delimited by the `byteLength` of its own header. Inner tiles may be any
//! registered format, including further composites.

use std::any::Any;
use std::io::{Cursor, Read, Write};

use super::header::{CmptHeader, TileByteOrder, TileFormat};
use super::model::{payload_len, TileModel};
use super::registry::TileRegistry;
use super::stream::TileWriter;
use crate::util::{read_bytes, to_u32, Error, Result};

#[derive(Debug)]
pub struct Cmpt {
    pub header: CmptHeader,
    pub tiles: Vec<Box<dyn TileModel>>,
    /// Dispatch table for inner tiles.
    pub registry: TileRegistry,
}

impl Default for Cmpt {
    fn default() -> Self {
        Self::new()
    }
}

impl Cmpt {
    pub fn new() -> Self {
        Self::with_registry(TileRegistry::default())
    }

    pub fn with_registry(registry: TileRegistry) -> Self {
        Self { header: CmptHeader::new(), tiles: Vec::new(), registry }
    }

    pub fn push(&mut self, tile: impl TileModel) {
        self.tiles.push(Box::new(tile));
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Non-composite tiles in depth-first order.
    pub fn leaves(&self) -> Vec<&(dyn TileModel + 'static)> {
        let mut out = Vec::new();
        for tile in &self.tiles {
            match tile.downcast_ref::<Cmpt>() {
                Some(inner) => out.extend(inner.leaves()),
                None => out.push(&**tile),
            }
        }
        out
    }
}

impl TileModel for Cmpt {
    fn format(&self) -> TileFormat {
        TileFormat::Cmpt
    }

    fn version(&self) -> u32 {
        self.header.version
    }

    fn byte_length(&self) -> u32 {
        self.header.byte_length
    }

    fn calc_size(&self) -> Result<u64> {
        self.tiles
            .iter()
            .try_fold(CmptHeader::SIZE as u64, |total, tile| Ok(total + tile.calc_size()?))
    }

    fn read(&mut self, reader: &mut dyn Read) -> Result<()> {
        let header = CmptHeader::read::<TileByteOrder>(reader)?;
        let body_len = payload_len(header.byte_length, CmptHeader::SIZE as u64)?;
        let mut body = Cursor::new(read_bytes(reader, body_len, "cmpt tiles")?);

        let mut tiles = Vec::with_capacity(header.tiles_length.min(1024) as usize);
        for index in 0..header.tiles_length {
            let tile = self.registry.read_tile(&mut body)?;
            tracing::trace!(index, format = %tile.format(), byte_length = tile.byte_length(), "cmpt child");
            tiles.push(tile);
        }

        let leftover = body_len - body.position();
        if leftover > 0 {
            tracing::warn!(leftover, "ignoring bytes after the last cmpt child");
        }

        self.header = header;
        self.tiles = tiles;
        tracing::debug!(byte_length = header.byte_length, tiles = header.tiles_length, "read cmpt");
        Ok(())
    }

    fn write(&mut self, writer: &mut dyn Write) -> Result<()> {
        let mut children = Vec::with_capacity(self.tiles.len());
        for tile in &mut self.tiles {
            let expected = tile.calc_size()?;
            let bytes = tile.to_bytes()?;
            if bytes.len() as u64 != expected {
                return Err(Error::SizeMismatch { declared: expected, actual: bytes.len() as u64 });
            }
            children.push(bytes);
        }

        let total = CmptHeader::SIZE + children.iter().map(Vec::len).sum::<usize>();
        self.header.tiles_length = to_u32(children.len(), "cmpt tile count")?;
        self.header.byte_length = to_u32(total, "cmpt tile")?;

        let mut out = TileWriter::new(writer);
        self.header.write::<TileByteOrder>(&mut out)?;
        for bytes in &children {
            out.write_bytes(bytes)?;
        }
        out.finish(total as u64)?;

        tracing::debug!(byte_length = total, tiles = children.len(), "wrote cmpt");
        Ok(())
    }

    fn children(&self) -> &[Box<dyn TileModel>] {
        &self.tiles
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
    use crate::format::{B3dm, Pnts};

    fn sample() -> Cmpt {
        let mut cmpt = Cmpt::new();
        cmpt.push(B3dm::with_glb(b"glTF\x02\0\0\0\x0c\0\0\0".to_vec()));
        cmpt.push(Pnts::new());
        cmpt
    }

    #[test]
    fn test_roundtrip_keeps_order() {
        let mut cmpt = sample();
        let bytes = cmpt.to_bytes().unwrap();
        assert_eq!(bytes.len() as u64, cmpt.calc_size().unwrap());
        assert_eq!(cmpt.header.tiles_length, 2);
        assert_eq!(cmpt.header.byte_length as usize, bytes.len());

        let mut back = Cmpt::new();
        back.read(&mut Cursor::new(&bytes)).unwrap();
        let formats: Vec<_> = back.children().iter().map(|t| t.format()).collect();
        assert_eq!(formats, vec![TileFormat::B3dm, TileFormat::Pnts]);
        assert_eq!(back.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_nested_composite() {
        let mut outer = Cmpt::new();
        outer.push(sample());
        outer.push(Pnts::new());
        let bytes = outer.to_bytes().unwrap();

        let mut back = Cmpt::new();
        back.read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.tiles[0].children().len(), 2);
        let leaves: Vec<_> = back.leaves().iter().map(|t| t.format()).collect();
        assert_eq!(leaves, vec![TileFormat::B3dm, TileFormat::Pnts, TileFormat::Pnts]);
    }

    #[test]
    fn test_unregistered_child() {
        let bytes = sample().to_bytes().unwrap();
        let mut registry = TileRegistry::empty();
        registry.register(*b"b3dm", || -> Box<dyn TileModel> { Box::new(B3dm::new()) });
        let err = Cmpt::with_registry(registry).read(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::UnknownMagic(ref m) if m == "pnts"));
    }

    #[test]
    fn test_missing_child() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[12..16].copy_from_slice(&3u32.to_le_bytes());
        let err = Cmpt::new().read(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof(_)));
    }

    #[test]
    fn test_empty_composite() {
        let mut cmpt = Cmpt::new();
        let bytes = cmpt.to_bytes().unwrap();
        assert_eq!(bytes.len(), CmptHeader::SIZE);
        let mut back = Cmpt::new();
        back.read(&mut Cursor::new(&bytes)).unwrap();
        assert!(back.is_empty());
    }
}
