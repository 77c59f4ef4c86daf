//! Component and container types of binary body properties.

use std::fmt;

/// Scalar storage type of one component, as named by the `componentType`
/// token of a binary body reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ComponentType {
    /// Signed 8-bit integer
    Byte = 0,
    /// Unsigned 8-bit integer
    UnsignedByte,
    /// Signed 16-bit integer
    Short,
    /// Unsigned 16-bit integer
    UnsignedShort,
    /// Signed 32-bit integer
    Int,
    /// Unsigned 32-bit integer
    UnsignedInt,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl ComponentType {
    /// All component types in token order.
    pub const ALL: [Self; 8] = [
        Self::Byte,
        Self::UnsignedByte,
        Self::Short,
        Self::UnsignedShort,
        Self::Int,
        Self::UnsignedInt,
        Self::Float,
        Self::Double,
    ];

    /// Returns the size in bytes of one component.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Returns the JSON token for this type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "BYTE",
            Self::UnsignedByte => "UNSIGNED_BYTE",
            Self::Short => "SHORT",
            Self::UnsignedShort => "UNSIGNED_SHORT",
            Self::Int => "INT",
            Self::UnsignedInt => "UNSIGNED_INT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
        }
    }

    /// Parse a JSON token.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// True for the unsigned integer types usable as batch ids.
    #[inline]
    pub const fn is_unsigned_integer(self) -> bool {
        matches!(self, Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt)
    }

    /// True for FLOAT and DOUBLE.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of components per element, as named by the `type` token of a
/// binary body reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ContainerType {
    Scalar = 1,
    Vec2 = 2,
    Vec3 = 3,
    Vec4 = 4,
}

impl ContainerType {
    pub const ALL: [Self; 4] = [Self::Scalar, Self::Vec2, Self::Vec3, Self::Vec4];

    /// Components per element.
    #[inline]
    pub const fn num_components(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Container holding `n` components, if there is one.
    pub const fn from_components(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::Scalar),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_widths() {
        let widths: Vec<usize> = ComponentType::ALL.iter().map(|c| c.num_bytes()).collect();
        assert_eq!(widths, vec![1, 1, 2, 2, 4, 4, 4, 8]);
    }

    #[test]
    fn test_component_tokens() {
        for c in ComponentType::ALL {
            assert_eq!(ComponentType::from_name(c.name()), Some(c));
        }
        assert_eq!(ComponentType::from_name("HALF"), None);
        assert_eq!(ComponentType::from_name("float"), None);
        assert_eq!(ComponentType::UnsignedShort.to_string(), "UNSIGNED_SHORT");
    }

    #[test]
    fn test_container_types() {
        for c in ContainerType::ALL {
            assert_eq!(ContainerType::from_name(c.name()), Some(c));
            assert_eq!(ContainerType::from_components(c.num_components()), Some(c));
        }
        assert_eq!(ContainerType::Vec3.num_components(), 3);
        assert_eq!(ContainerType::from_name("MAT4"), None);
        assert_eq!(ContainerType::from_components(16), None);
    }
}
