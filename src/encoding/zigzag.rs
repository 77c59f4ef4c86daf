//! Zig-zag delta coding for vector tile positions.
//!
//! Each coordinate axis is stored as the zig-zag encoded difference to the
//! previous vertex (the first vertex is relative to 0). Arithmetic wraps at
//! 16 bits so every `u16` sequence survives a round trip.

/// Map a signed delta onto an unsigned code: 0, -1, 1, -2, ... -> 0, 1, 2, 3, ...
#[inline]
pub const fn zigzag_encode(v: i16) -> u16 {
    ((v << 1) ^ (v >> 15)) as u16
}

#[inline]
pub const fn zigzag_decode(v: u16) -> i16 {
    ((v >> 1) as i16) ^ -((v & 1) as i16)
}

/// Zig-zag encoded deltas of one axis.
pub fn delta_encode(values: &[u16]) -> Vec<u16> {
    let mut prev = 0u16;
    values
        .iter()
        .map(|&v| {
            let delta = v.wrapping_sub(prev) as i16;
            prev = v;
            zigzag_encode(delta)
        })
        .collect()
}

/// Inverse of [`delta_encode`].
pub fn delta_decode(codes: &[u16]) -> Vec<u16> {
    let mut acc = 0u16;
    codes
        .iter()
        .map(|&c| {
            acc = acc.wrapping_add(zigzag_decode(c) as u16);
            acc
        })
        .collect()
}

/// Encode 2D positions into planar `(u[], v[])` code arrays.
pub fn encode_positions2(points: &[[u16; 2]]) -> [Vec<u16>; 2] {
    let us: Vec<u16> = points.iter().map(|p| p[0]).collect();
    let vs: Vec<u16> = points.iter().map(|p| p[1]).collect();
    [delta_encode(&us), delta_encode(&vs)]
}

/// Decode planar `(u[], v[])` code arrays; extra codes on a longer axis are ignored.
pub fn decode_positions2(us: &[u16], vs: &[u16]) -> Vec<[u16; 2]> {
    delta_decode(us)
        .into_iter()
        .zip(delta_decode(vs))
        .map(|(u, v)| [u, v])
        .collect()
}

/// Encode 3D positions into planar `(u[], v[], h[])` code arrays.
pub fn encode_positions3(points: &[[u16; 3]]) -> [Vec<u16>; 3] {
    let axis = |i: usize| -> Vec<u16> { delta_encode(&points.iter().map(|p| p[i]).collect::<Vec<_>>()) };
    [axis(0), axis(1), axis(2)]
}

pub fn decode_positions3(us: &[u16], vs: &[u16], hs: &[u16]) -> Vec<[u16; 3]> {
    delta_decode(us)
        .into_iter()
        .zip(delta_decode(vs))
        .zip(delta_decode(hs))
        .map(|((u, v), h)| [u, v, h])
        .collect()
}
