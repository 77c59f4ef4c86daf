//! Octahedron-encoded unit normals.
//!
//! A unit vector is projected onto the octahedron `|x|+|y|+|z| = 1`, the
//! lower hemisphere folded over the upper one, and the resulting `(x, y)`
//! in `[-1, 1]` stored as two unsigned integers in `[0, range]`.

use crate::util::Vec3;

/// Range of the 8-bit forms (`NORMAL_OCT16P`, packed u16).
pub const OCT_RANGE_8: u16 = 255;

/// Range of the 16-bit form (`NORMAL_UP_OCT32P`, `NORMAL_RIGHT_OCT32P`).
pub const OCT_RANGE_16: u16 = 65535;

/// Vectors shorter than this are left unnormalized after decoding.
const NORMALIZE_EPSILON: f32 = 1e-6;

#[inline]
fn sign_not_zero(v: f32) -> f32 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[inline]
fn to_snorm(v: f32, range: u16) -> u16 {
    let unit = f64::from(v.clamp(-1.0, 1.0)) * 0.5 + 0.5;
    (0.5 + unit * f64::from(range)).floor() as u16
}

#[inline]
fn from_snorm(v: u16, range: u16) -> f32 {
    (f64::from(v) / f64::from(range) * 2.0 - 1.0) as f32
}

/// Encode `n` with `range` steps per axis.
pub fn oct_encode_range(n: Vec3, range: u16) -> [u16; 2] {
    let denom = n.x.abs() + n.y.abs() + n.z.abs();
    if denom == 0.0 {
        return [to_snorm(0.0, range), to_snorm(0.0, range)];
    }
    let mut x = n.x / denom;
    let mut y = n.y / denom;
    if n.z < 0.0 {
        let (ox, oy) = (x, y);
        x = (1.0 - oy.abs()) * sign_not_zero(ox);
        y = (1.0 - ox.abs()) * sign_not_zero(oy);
    }
    [to_snorm(x, range), to_snorm(y, range)]
}

/// Decode a pair produced by [`oct_encode_range`] with the same `range`.
pub fn oct_decode_range(x: u16, y: u16, range: u16) -> Vec3 {
    let ex = from_snorm(x, range);
    let ey = from_snorm(y, range);
    let mut n = Vec3::new(ex, ey, 1.0 - ex.abs() - ey.abs());
    if n.z < 0.0 {
        n.x = (1.0 - ey.abs()) * sign_not_zero(ex);
        n.y = (1.0 - ex.abs()) * sign_not_zero(ey);
    }
    let len = n.length();
    if len > NORMALIZE_EPSILON {
        n / len
    } else {
        n
    }
}

/// 8-bit pair packed as `x | y << 8`.
pub fn oct_encode(n: Vec3) -> u16 {
    let [x, y] = oct_encode_range(n, OCT_RANGE_8);
    x | (y << 8)
}

pub fn oct_decode(packed: u16) -> Vec3 {
    oct_decode_range(packed & 0xFF, packed >> 8, OCT_RANGE_8)
}

/// 8-bit pair as two bytes (`NORMAL_OCT16P`).
pub fn oct_encode_bytes(n: Vec3) -> [u8; 2] {
    let [x, y] = oct_encode_range(n, OCT_RANGE_8);
    [x as u8, y as u8]
}

pub fn oct_decode_bytes(e: [u8; 2]) -> Vec3 {
    oct_decode_range(u16::from(e[0]), u16::from(e[1]), OCT_RANGE_8)
}

/// 16-bit pair (`NORMAL_UP_OCT32P`, `NORMAL_RIGHT_OCT32P`).
pub fn oct_encode_u16(n: Vec3) -> [u16; 2] {
    oct_encode_range(n, OCT_RANGE_16)
}

pub fn oct_decode_u16(e: [u16; 2]) -> Vec3 {
    oct_decode_range(e[0], e[1], OCT_RANGE_16)
}

/// Packed 8-bit octahedron normal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OctEncodedNormal(pub u16);

impl OctEncodedNormal {
    pub fn new(n: Vec3) -> Self {
        Self(oct_encode(n))
    }

    pub fn decode(self) -> Vec3 {
        oct_decode(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: Vec3, b: Vec3, eps: f32) -> bool {
        (a - b).length() <= eps
    }

    #[test]
    fn test_axes() {
        for axis in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::X, -Vec3::Y, -Vec3::Z] {
            assert!(close(oct_decode(oct_encode(axis)), axis, 1e-2), "{axis:?}");
            assert!(close(oct_decode_u16(oct_encode_u16(axis)), axis, 1e-4), "{axis:?}");
        }
    }

    #[test]
    fn test_up_encodes_to_center() {
        assert_eq!(oct_encode_bytes(Vec3::Z), [128, 128]);
        assert_eq!(oct_encode(Vec3::Z), 128 | (128 << 8));
    }

    #[test]
    fn test_wrapper() {
        let n = Vec3::new(0.0, 0.6, 0.8);
        let e = OctEncodedNormal::new(n);
        assert!(close(e.decode(), n, 2e-2));
    }

    #[test]
    fn test_zero_vector_does_not_panic() {
        let d = oct_decode(oct_encode(Vec3::ZERO));
        assert!(d.is_finite());
    }

    fn unit_vector() -> impl Strategy<Value = Vec3> {
        (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0)
            .prop_filter("non-degenerate", |(x, y, z)| x * x + y * y + z * z > 0.01)
            .prop_map(|(x, y, z)| Vec3::new(x, y, z).normalize())
    }

    proptest! {
        #[test]
        fn prop_oct8_roundtrip(n in unit_vector()) {
            let d = oct_decode(oct_encode(n));
            prop_assert!(close(d, n, 0.05), "{:?} -> {:?}", n, d);
            prop_assert!((d.length() - 1.0).abs() < 1e-4);
        }

        #[test]
        fn prop_oct8_bytes_matches_packed(n in unit_vector()) {
            let [x, y] = oct_encode_bytes(n);
            prop_assert_eq!(u16::from(x) | (u16::from(y) << 8), oct_encode(n));
        }

        #[test]
        fn prop_oct16_roundtrip(n in unit_vector()) {
            let d = oct_decode_u16(oct_encode_u16(n));
            prop_assert!(close(d, n, 1e-3), "{:?} -> {:?}", n, d);
        }
    }
}
