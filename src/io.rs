//! File-level entry points.
//!
//! Reading dispatches on the tile magic through a [`TileRegistry`], so the
//! result is a `Box<dyn TileModel>` of whatever kind the file holds.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::format::{TileModel, TileRegistry};
use crate::util::{Error, Result};

/// Parse one tile from memory.
pub fn from_bytes(bytes: &[u8]) -> Result<Box<dyn TileModel>> {
    read_tile(&mut Cursor::new(bytes))
}

/// Parse one tile from a seekable stream with the default registry.
pub fn read_tile<R: Read + Seek>(reader: &mut R) -> Result<Box<dyn TileModel>> {
    TileRegistry::default().read_tile(reader)
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })
}

/// Read a tile file.
#[cfg(feature = "mmap")]
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn TileModel>> {
    let path = path.as_ref();
    let file = open_file(path)?;
    if file.metadata()?.len() == 0 {
        return Err(Error::UnexpectedEof("tile magic"));
    }
    // Safety: the map is read-only and dropped before this function returns.
    let mmap = unsafe { memmap2::Mmap::map(&file) }?;
    let tile = from_bytes(&mmap)?;
    tracing::debug!(path = %path.display(), format = %tile.format(), "opened tile");
    Ok(tile)
}

/// Read a tile file.
#[cfg(not(feature = "mmap"))]
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn TileModel>> {
    let path = path.as_ref();
    let mut bytes = Vec::new();
    open_file(path)?.read_to_end(&mut bytes)?;
    let tile = from_bytes(&bytes)?;
    tracing::debug!(path = %path.display(), format = %tile.format(), "opened tile");
    Ok(tile)
}

/// Write a tile to `path`, replacing any existing file.
pub fn save(tile: &mut dyn TileModel, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    tile.write(&mut out)?;
    out.flush()?;
    tracing::debug!(path = %path.display(), byte_length = tile.byte_length(), "saved tile");
    Ok(())
}

/// Read many files in parallel; results keep the order of `paths`.
pub fn open_many<P: AsRef<Path> + Sync>(paths: &[P]) -> Vec<(PathBuf, Result<Box<dyn TileModel>>)> {
    paths
        .par_iter()
        .map(|p| (p.as_ref().to_path_buf(), open(p)))
        .collect()
}
