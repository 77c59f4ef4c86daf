//! Byte alignment and section I/O primitives shared by every tile format.

use std::io::Read;

use super::error::{eof_or_io, Error, Result};

/// Every JSON header and binary body ends on this boundary.
pub const SECTION_ALIGNMENT: usize = 8;

/// Fill byte for JSON headers and URI payloads (ASCII space).
pub const JSON_PADDING: u8 = b' ';

/// Fill byte for binary bodies.
pub const BINARY_PADDING: u8 = 0x00;

/// Number of bytes needed to move `offset` up to the next multiple of `unit`.
#[inline]
pub const fn calc_padding(offset: usize, unit: usize) -> usize {
    if unit == 0 {
        return 0;
    }
    (unit - offset % unit) % unit
}

/// Pad `buf` so that `base + buf.len()` becomes a multiple of `unit`.
///
/// `base` is the absolute position at which `buf` will be written, which lets
/// a section end on a boundary relative to the start of its tile.
pub fn pad_to(buf: &mut Vec<u8>, base: usize, unit: usize, fill: u8) {
    let padding = calc_padding(base + buf.len(), unit);
    buf.resize(buf.len() + padding, fill);
}

/// Strip trailing space and NUL padding.
pub fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != JSON_PADDING && b != 0)
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Convert a section length to the u32 stored in tile headers.
pub fn to_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::invalid(format!("{what} of {len} bytes exceeds the 4 GiB limit")))
}

/// Read exactly `len` bytes without trusting `len` for the allocation size.
pub(crate) fn read_bytes<R: Read + ?Sized>(reader: &mut R, len: u64, section: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    Read::take(&mut *reader, len)
        .read_to_end(&mut buf)
        .map_err(|e| eof_or_io(e, section))?;
    if (buf.len() as u64) < len {
        return Err(Error::UnexpectedEof(section));
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_padding() {
        assert_eq!(calc_padding(0, 8), 0);
        assert_eq!(calc_padding(1, 8), 7);
        assert_eq!(calc_padding(8, 8), 0);
        assert_eq!(calc_padding(28, 8), 4);
        assert_eq!(calc_padding(3, 4), 1);
        assert_eq!(calc_padding(5, 1), 0);
        assert_eq!(calc_padding(5, 0), 0);
    }

    #[test]
    fn test_pad_to_absolute_base() {
        let mut json = b"{}".to_vec();
        pad_to(&mut json, 28, SECTION_ALIGNMENT, JSON_PADDING);
        assert_eq!(json, b"{}  ");
        assert_eq!((28 + json.len()) % 8, 0);
    }

    #[test]
    fn test_trim_padding() {
        assert_eq!(trim_padding(b"{\"a\":1}   "), b"{\"a\":1}");
        assert_eq!(trim_padding(b"uri.glb \0\0"), b"uri.glb");
        assert_eq!(trim_padding(b"    "), b"");
        assert_eq!(trim_padding(b""), b"");
    }

    #[test]
    fn test_read_bytes_short() {
        let data = [1u8, 2, 3];
        let mut cursor = std::io::Cursor::new(&data[..]);
        assert_eq!(read_bytes(&mut cursor, 2, "test").unwrap(), vec![1, 2]);
        let err = read_bytes(&mut cursor, 4, "test").unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof("test")));
    }
}
