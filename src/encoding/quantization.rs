//! 16-bit position quantization.
//!
//! A quantized position stores `floor((pos - origin) * scale)` with
//! `scale = 65535 / extent`, clamped to the u16 range. The
//! `QUANTIZED_VOLUME_OFFSET` / `QUANTIZED_VOLUME_SCALE` pair of a feature
//! table is exactly `origin` / `extent`.

use crate::util::{BBox3d, DVec3, Vec3};

/// Largest quantized value.
pub const QUANTIZED_RANGE: f64 = 65535.0;

/// Steps per unit for an axis of length `extent`; 0 for a degenerate axis.
#[inline]
pub fn quantization_scale(extent: f64) -> f64 {
    if extent == 0.0 {
        0.0
    } else {
        QUANTIZED_RANGE / extent
    }
}

/// Quantize one coordinate.
#[inline]
pub fn quantize(pos: f64, origin: f64, scale: f64) -> u16 {
    ((pos - origin) * scale).clamp(0.0, QUANTIZED_RANGE).floor() as u16
}

/// Recover one coordinate; a zero scale collapses to the origin.
#[inline]
pub fn unquantize(q: u16, origin: f64, scale: f64) -> f64 {
    if scale == 0.0 {
        origin
    } else {
        origin + f64::from(q) / scale
    }
}

/// Quantization volume for positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantizationParams {
    /// Lower corner of the volume.
    pub origin: DVec3,
    /// Steps per unit along each axis.
    pub scale: DVec3,
}

impl QuantizationParams {
    /// Volume spanning `min..=max`.
    pub fn from_range(min: DVec3, max: DVec3) -> Self {
        Self::from_volume(min, max - min)
    }

    /// Volume from a feature table's offset/scale pair.
    pub fn from_volume(offset: DVec3, extent: DVec3) -> Self {
        Self {
            origin: offset,
            scale: DVec3::new(
                quantization_scale(extent.x),
                quantization_scale(extent.y),
                quantization_scale(extent.z),
            ),
        }
    }

    /// Tightest volume around `points`; `None` for an empty set.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        let bbox = BBox3d::from_points(points.iter().copied());
        (!bbox.is_empty()).then(|| Self::from_range(bbox.min, bbox.max))
    }

    /// The `QUANTIZED_VOLUME_OFFSET` of this volume.
    #[inline]
    pub fn volume_offset(&self) -> DVec3 {
        self.origin
    }

    /// The `QUANTIZED_VOLUME_SCALE` of this volume (its extent).
    pub fn volume_scale(&self) -> DVec3 {
        let axis = |s: f64| if s == 0.0 { 0.0 } else { QUANTIZED_RANGE / s };
        DVec3::new(axis(self.scale.x), axis(self.scale.y), axis(self.scale.z))
    }

    pub fn quantize_point(&self, p: DVec3) -> [u16; 3] {
        [
            quantize(p.x, self.origin.x, self.scale.x),
            quantize(p.y, self.origin.y, self.scale.y),
            quantize(p.z, self.origin.z, self.scale.z),
        ]
    }

    pub fn unquantize_point(&self, q: [u16; 3]) -> DVec3 {
        DVec3::new(
            unquantize(q[0], self.origin.x, self.scale.x),
            unquantize(q[1], self.origin.y, self.scale.y),
            unquantize(q[2], self.origin.z, self.scale.z),
        )
    }

    /// Single-precision convenience for float position arrays.
    pub fn quantize_vec3(&self, p: Vec3) -> [u16; 3] {
        self.quantize_point(p.as_dvec3())
    }
}
