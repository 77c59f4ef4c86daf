//! Magic-to-model dispatch.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};

use super::b3dm::B3dm;
use super::cmpt::Cmpt;
use super::geom::Geom;
use super::header::{TileFormat, MAGIC_SIZE};
use super::i3dm::I3dm;
use super::model::TileModel;
use super::pnts::Pnts;
use super::vctr::Vctr;
use crate::util::{eof_or_io, magic_str, Error, Result};

/// Creates an empty model ready for `read`.
pub type TileFactory = fn() -> Box<dyn TileModel>;

fn new_b3dm() -> Box<dyn TileModel> {
    Box::new(B3dm::new())
}

fn new_i3dm() -> Box<dyn TileModel> {
    Box::new(I3dm::new())
}

fn new_pnts() -> Box<dyn TileModel> {
    Box::new(Pnts::new())
}

fn new_geom() -> Box<dyn TileModel> {
    Box::new(Geom::new())
}

fn new_vctr() -> Box<dyn TileModel> {
    Box::new(Vctr::new())
}

fn new_cmpt() -> Box<dyn TileModel> {
    Box::new(Cmpt::new())
}

/// Table of tile factories keyed by 4-byte magic.
///
/// The default registry knows every built-in format, composites included.
/// Extra kinds can be added with [`TileRegistry::register`].
#[derive(Clone)]
pub struct TileRegistry {
    factories: HashMap<[u8; 4], TileFactory>,
}

impl TileRegistry {
    /// Registry with no formats.
    pub fn empty() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Add or replace the factory for `magic`.
    pub fn register(&mut self, magic: [u8; 4], factory: TileFactory) -> &mut Self {
        self.factories.insert(magic, factory);
        self
    }

    pub fn contains(&self, magic: &[u8; 4]) -> bool {
        self.factories.contains_key(magic)
    }

    /// Registered magics, sorted.
    pub fn magics(&self) -> Vec<[u8; 4]> {
        let mut magics: Vec<_> = self.factories.keys().copied().collect();
        magics.sort_unstable();
        magics
    }

    /// Empty model for `magic`.
    pub fn create(&self, magic: &[u8; 4]) -> Result<Box<dyn TileModel>> {
        let factory = self.factories.get(magic).ok_or_else(|| Error::UnknownMagic(magic_str(magic)))?;
        Ok(factory())
    }

    /// Read the next tile's magic and rewind to where it started.
    pub fn peek_magic<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<[u8; 4]> {
        let mut magic = [0u8; MAGIC_SIZE];
        reader.read_exact(&mut magic).map_err(|e| eof_or_io(e, "tile magic"))?;
        reader.seek(SeekFrom::Current(-(MAGIC_SIZE as i64)))?;
        Ok(magic)
    }

    /// Dispatch on the next tile's magic and read it.
    ///
    /// Composites created here read their children through this registry.
    pub fn read_tile<R: Read + Seek>(&self, reader: &mut R) -> Result<Box<dyn TileModel>> {
        let magic = Self::peek_magic(reader)?;
        let mut tile = self.create(&magic)?;
        if let Some(cmpt) = tile.downcast_mut::<Cmpt>() {
            cmpt.registry = self.clone();
        }
        tile.read(reader)?;
        Ok(tile)
    }
}

impl Default for TileRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let factories: [(TileFormat, TileFactory); 6] = [
            (TileFormat::B3dm, new_b3dm),
            (TileFormat::I3dm, new_i3dm),
            (TileFormat::Pnts, new_pnts),
            (TileFormat::Geom, new_geom),
            (TileFormat::Vctr, new_vctr),
            (TileFormat::Cmpt, new_cmpt),
        ];
        for (format, factory) in factories {
            registry.register(format.magic(), factory);
        }
        registry
    }
}

impl fmt::Debug for TileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.magics().iter().map(magic_str)).finish()
    }
}
