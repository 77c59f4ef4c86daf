//! RGB565 point colors.

/// Expand a 5-6-5 packed color to 8 bits per channel.
pub fn rgb565_decode(c: u16) -> [u8; 3] {
    let r = (c >> 11) & 0x1F;
    let g = (c >> 5) & 0x3F;
    let b = c & 0x1F;
    [
        (r * 255 / 31) as u8,
        (g * 255 / 63) as u8,
        (b * 255 / 31) as u8,
    ]
}

/// Pack an 8-bit color into 5-6-5 by truncating the low bits.
pub fn rgb565_encode(rgb: [u8; 3]) -> u16 {
    (u16::from(rgb[0] >> 3) << 11) | (u16::from(rgb[1] >> 2) << 5) | u16::from(rgb[2] >> 3)
}
