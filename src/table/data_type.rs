//! DataType - combines a component type with a container type.

use super::{ComponentType, ContainerType};
use std::fmt;

/// DataType describes how one element of a binary body property is stored.
///
/// For example, a point position is `FLOAT` with container `VEC3`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// Storage type of each component
    pub component: ComponentType,
    /// Number of components per element
    pub container: ContainerType,
}

impl DataType {
    #[inline]
    pub const fn new(component: ComponentType, container: ContainerType) -> Self {
        Self { component, container }
    }

    /// Create a scalar DataType.
    #[inline]
    pub const fn scalar(component: ComponentType) -> Self {
        Self::new(component, ContainerType::Scalar)
    }

    /// Returns the total size in bytes for one element.
    #[inline]
    pub const fn num_bytes(&self) -> usize {
        self.component.num_bytes() * self.container.num_components()
    }

    // === Common predefined types ===

    pub const UINT8: Self = Self::scalar(ComponentType::UnsignedByte);
    pub const UINT16: Self = Self::scalar(ComponentType::UnsignedShort);
    pub const UINT32: Self = Self::scalar(ComponentType::UnsignedInt);
    pub const FLOAT32: Self = Self::scalar(ComponentType::Float);

    pub const VEC3F: Self = Self::new(ComponentType::Float, ContainerType::Vec3);
    pub const VEC3D: Self = Self::new(ComponentType::Double, ContainerType::Vec3);
    pub const VEC2US: Self = Self::new(ComponentType::UnsignedShort, ContainerType::Vec2);
    pub const VEC3US: Self = Self::new(ComponentType::UnsignedShort, ContainerType::Vec3);
    pub const VEC2UB: Self = Self::new(ComponentType::UnsignedByte, ContainerType::Vec2);
    pub const VEC3UB: Self = Self::new(ComponentType::UnsignedByte, ContainerType::Vec3);
    pub const VEC4UB: Self = Self::new(ComponentType::UnsignedByte, ContainerType::Vec4);
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataType({} {})", self.component, self.container)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.container == ContainerType::Scalar {
            write!(f, "{}", self.component)
        } else {
            write!(f, "{}[{}]", self.component, self.container)
        }
    }
}
