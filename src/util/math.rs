//! glam re-exports and the bounds type used to size quantization volumes.

pub use glam::{DVec3, Vec3};

/// Axis-aligned bounds of a point set, in double precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox3d {
    pub min: DVec3,
    pub max: DVec3,
}

impl BBox3d {
    /// Inverted bounds that any point will replace.
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut bbox, p| {
            bbox.include(p);
            bbox
        })
    }

    #[inline]
    pub fn include(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// No point included yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }
}
