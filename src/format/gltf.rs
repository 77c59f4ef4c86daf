//! Minimal binary glTF framing.
//!
//! Tile payloads are opaque to this crate; only the 12-byte GLB header is
//! looked at, to strip the padding a tile adds after the model.

use byteorder::{ByteOrder, LittleEndian};

pub const GLB_MAGIC: [u8; 4] = *b"glTF";
pub const GLB_HEADER_SIZE: usize = 12;

/// Version and total length from a GLB header, if `bytes` starts with one.
pub fn glb_header(bytes: &[u8]) -> Option<(u32, usize)> {
    if bytes.len() < GLB_HEADER_SIZE || bytes[0..4] != GLB_MAGIC {
        return None;
    }
    let version = LittleEndian::read_u32(&bytes[4..8]);
    let length = LittleEndian::read_u32(&bytes[8..12]) as usize;
    Some((version, length))
}

/// `bytes` cut to the length declared by its GLB header. Anything that is
/// not a well-formed GLB is returned unchanged.
pub fn trim_glb(bytes: &[u8]) -> &[u8] {
    match glb_header(bytes) {
        Some((_, length)) if length <= bytes.len() => &bytes[..length],
        _ => bytes,
    }
}
