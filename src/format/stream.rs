//! Output stream wrapper that tracks the write position.

use std::io::{self, Write};

use crate::util::{Error, Result};

/// Writer adapter counting the bytes that pass through it.
///
/// Tile writers use it to check that what they emitted matches the
/// `byteLength` they stamped into the header.
pub struct TileWriter<'a, W: Write + ?Sized> {
    writer: &'a mut W,
    pos: u64,
}

impl<'a, W: Write + ?Sized> TileWriter<'a, W> {
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer, pos: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data)?;
        Ok(())
    }

    /// Fail with [`Error::SizeMismatch`] unless exactly `declared` bytes were written.
    pub fn finish(self, declared: u64) -> Result<()> {
        if self.pos != declared {
            return Err(Error::SizeMismatch { declared, actual: self.pos });
        }
        Ok(())
    }
}

impl<W: Write + ?Sized> Write for TileWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
