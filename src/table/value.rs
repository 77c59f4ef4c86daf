//! Typed property values.
//!
//! Table headers hold [`HeaderValue`]s: JSON literals or references still
//! pending resolution. Table data holds [`PropertyValue`]s: arrays decoded
//! from the binary body, or inline JSON arrays.

use std::collections::BTreeMap;

use byteorder::ByteOrder;
use bytemuck::Pod;
use serde_json::Value;

use super::{BinaryBodyReference, ComponentType, ContainerType, DataType};
use crate::util::{DVec3, Vec3};

/// Parsed JSON header of a feature or batch table.
pub type TableHeader = BTreeMap<String, HeaderValue>;

/// Decoded per-element values of a feature or batch table.
pub type TableData = BTreeMap<String, PropertyValue>;

/// One entry of a table JSON header.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    /// Inline JSON (counts, flags, RTC_CENTER, extensions, inline arrays).
    Literal(Value),
    /// Reference into the binary body, resolved during decode.
    Reference(BinaryBodyReference),
}

impl HeaderValue {
    /// JSON form as written to the header.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Reference(r) => r.to_json(),
        }
    }
}

/// One decoded table property.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Values stored in the binary body.
    Binary(BinaryProperty),
    /// JSON array carried inline in the header.
    Inline(Vec<Value>),
}

impl PropertyValue {
    pub fn as_binary(&self) -> Option<&BinaryProperty> {
        match self {
            Self::Binary(p) => Some(p),
            Self::Inline(_) => None,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(p) => p.len(),
            Self::Inline(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON value of element `index`.
    pub fn element_json(&self, index: usize) -> Option<Value> {
        match self {
            Self::Binary(p) => p.element_json(index),
            Self::Inline(values) => values.get(index).cloned(),
        }
    }
}

/// Flat component storage, one variant per component type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedArray {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! each_variant {
    ($array:expr, $v:ident => $body:expr) => {
        match $array {
            TypedArray::Int8($v) => $body,
            TypedArray::Uint8($v) => $body,
            TypedArray::Int16($v) => $body,
            TypedArray::Uint16($v) => $body,
            TypedArray::Int32($v) => $body,
            TypedArray::Uint32($v) => $body,
            TypedArray::Float32($v) => $body,
            TypedArray::Float64($v) => $body,
        }
    };
}

impl TypedArray {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::Int8(_) => ComponentType::Byte,
            Self::Uint8(_) => ComponentType::UnsignedByte,
            Self::Int16(_) => ComponentType::Short,
            Self::Uint16(_) => ComponentType::UnsignedShort,
            Self::Int32(_) => ComponentType::Int,
            Self::Uint32(_) => ComponentType::UnsignedInt,
            Self::Float32(_) => ComponentType::Float,
            Self::Float64(_) => ComponentType::Double,
        }
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.component_type().num_bytes()
    }

    /// Decode components from `bytes`. Trailing bytes that do not fill a
    /// whole component are ignored.
    pub fn read<B: ByteOrder>(component: ComponentType, bytes: &[u8]) -> Self {
        let count = bytes.len() / component.num_bytes();
        let bytes = &bytes[..count * component.num_bytes()];
        match component {
            ComponentType::Byte => Self::Int8(bytes.iter().map(|&b| b as i8).collect()),
            ComponentType::UnsignedByte => Self::Uint8(bytes.to_vec()),
            ComponentType::Short => {
                let mut v = vec![0i16; count];
                B::read_i16_into(bytes, &mut v);
                Self::Int16(v)
            }
            ComponentType::UnsignedShort => {
                let mut v = vec![0u16; count];
                B::read_u16_into(bytes, &mut v);
                Self::Uint16(v)
            }
            ComponentType::Int => {
                let mut v = vec![0i32; count];
                B::read_i32_into(bytes, &mut v);
                Self::Int32(v)
            }
            ComponentType::UnsignedInt => {
                let mut v = vec![0u32; count];
                B::read_u32_into(bytes, &mut v);
                Self::Uint32(v)
            }
            ComponentType::Float => {
                let mut v = vec![0f32; count];
                B::read_f32_into(bytes, &mut v);
                Self::Float32(v)
            }
            ComponentType::Double => {
                let mut v = vec![0f64; count];
                B::read_f64_into(bytes, &mut v);
                Self::Float64(v)
            }
        }
    }

    /// Append the encoded components to `out`.
    pub fn write<B: ByteOrder>(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.resize(start + self.byte_len(), 0);
        let dst = &mut out[start..];
        match self {
            Self::Int8(v) => {
                for (d, s) in dst.iter_mut().zip(v) {
                    *d = *s as u8;
                }
            }
            Self::Uint8(v) => dst.copy_from_slice(v),
            Self::Int16(v) => B::write_i16_into(v, dst),
            Self::Uint16(v) => B::write_u16_into(v, dst),
            Self::Int32(v) => B::write_i32_into(v, dst),
            Self::Uint32(v) => B::write_u32_into(v, dst),
            Self::Float32(v) => B::write_f32_into(v, dst),
            Self::Float64(v) => B::write_f64_into(v, dst),
        }
    }

    /// All components widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_variant!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    /// Unsigned integer components widened to u32.
    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        match self {
            Self::Uint8(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            Self::Uint16(v) => Some(v.iter().map(|&x| u32::from(x)).collect()),
            Self::Uint32(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn component_json(&self, index: usize) -> Option<Value> {
        each_variant!(self, v => v.get(index).map(|&x| Value::from(x)))
    }
}

/// Rust scalar types that map onto a [`ComponentType`].
pub trait ComponentValue: Pod + Send + Sync + 'static {
    const COMPONENT: ComponentType;

    fn slice(array: &TypedArray) -> Option<&[Self]>;

    fn wrap(values: Vec<Self>) -> TypedArray;
}

macro_rules! impl_component_value {
    ($($ty:ty => $variant:ident, $component:ident;)*) => {
        $(
            impl ComponentValue for $ty {
                const COMPONENT: ComponentType = ComponentType::$component;

                fn slice(array: &TypedArray) -> Option<&[Self]> {
                    match array {
                        TypedArray::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn wrap(values: Vec<Self>) -> TypedArray {
                    TypedArray::$variant(values)
                }
            }
        )*
    };
}

impl_component_value! {
    i8 => Int8, Byte;
    u8 => Uint8, UnsignedByte;
    i16 => Int16, Short;
    u16 => Uint16, UnsignedShort;
    i32 => Int32, Int;
    u32 => Uint32, UnsignedInt;
    f32 => Float32, Float;
    f64 => Float64, Double;
}

/// A property stored in a binary body: flat components plus their container.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryProperty {
    pub container: ContainerType,
    pub values: TypedArray,
}

impl BinaryProperty {
    pub fn new(container: ContainerType, values: TypedArray) -> Self {
        Self { container, values }
    }

    /// One component per element.
    pub fn scalars<T: ComponentValue>(values: &[T]) -> Self {
        Self::new(ContainerType::Scalar, T::wrap(values.to_vec()))
    }

    /// Fixed-size elements. Arrays longer than a VEC4 (e.g. 4x4 matrices)
    /// are stored as consecutive scalars.
    pub fn vectors<T: ComponentValue, const N: usize>(elements: &[[T; N]]) -> Self {
        let container = ContainerType::from_components(N).unwrap_or(ContainerType::Scalar);
        Self::new(container, T::wrap(bytemuck::cast_slice(elements).to_vec()))
    }

    pub fn from_vec3(points: &[Vec3]) -> Self {
        Self::new(ContainerType::Vec3, TypedArray::Float32(bytemuck::cast_slice(points).to_vec()))
    }

    pub fn from_dvec3(points: &[DVec3]) -> Self {
        Self::new(ContainerType::Vec3, TypedArray::Float64(bytemuck::cast_slice(points).to_vec()))
    }

    #[inline]
    pub fn component_type(&self) -> ComponentType {
        self.values.component_type()
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        DataType::new(self.component_type(), self.container)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.values.len() / self.container.num_components()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.values.byte_len()
    }

    /// Flat components, if stored as `T`.
    pub fn as_slice<T: ComponentValue>(&self) -> Option<&[T]> {
        T::slice(&self.values)
    }

    /// Components grouped `N` at a time, without copying.
    pub fn as_elements<T: ComponentValue, const N: usize>(&self) -> Option<&[[T; N]]> {
        if N == 0 || N % self.container.num_components() != 0 {
            return None;
        }
        bytemuck::try_cast_slice(T::slice(&self.values)?).ok()
    }

    /// VEC3 float elements as single-precision vectors.
    pub fn to_vec3(&self) -> Option<Vec<Vec3>> {
        if self.container != ContainerType::Vec3 {
            return None;
        }
        match &self.values {
            TypedArray::Float32(v) => bytemuck::try_cast_slice::<f32, Vec3>(v).ok().map(<[Vec3]>::to_vec),
            TypedArray::Float64(_) => Some(self.to_dvec3()?.into_iter().map(|p| p.as_vec3()).collect()),
            _ => None,
        }
    }

    /// VEC3 float elements as double-precision vectors.
    pub fn to_dvec3(&self) -> Option<Vec<DVec3>> {
        if self.container != ContainerType::Vec3 || !self.component_type().is_float() {
            return None;
        }
        let flat = self.values.to_f64_vec();
        Some(flat.chunks_exact(3).map(|c| DVec3::new(c[0], c[1], c[2])).collect())
    }

    /// Scalar unsigned integers widened to u32 (batch ids, counts).
    pub fn to_u32_vec(&self) -> Option<Vec<u32>> {
        if self.container != ContainerType::Scalar {
            return None;
        }
        self.values.to_u32_vec()
    }

    /// JSON value of element `index`: a number for scalars, an array otherwise.
    pub fn element_json(&self, index: usize) -> Option<Value> {
        let arity = self.container.num_components();
        if index >= self.len() {
            return None;
        }
        if arity == 1 {
            return self.values.component_json(index);
        }
        (0..arity)
            .map(|i| self.values.component_json(index * arity + i))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};
    use serde_json::json;

    #[test]
    fn test_typed_array_le_roundtrip() {
        let arr = TypedArray::Float32(vec![1.0, -2.5, 3.25]);
        let mut bytes = Vec::new();
        arr.write::<LittleEndian>(&mut bytes);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(TypedArray::read::<LittleEndian>(ComponentType::Float, &bytes), arr);
    }

    #[test]
    fn test_typed_array_byte_order_is_explicit() {
        let arr = TypedArray::Uint16(vec![0x0102]);
        let mut le = Vec::new();
        let mut be = Vec::new();
        arr.write::<LittleEndian>(&mut le);
        arr.write::<BigEndian>(&mut be);
        assert_eq!(le, vec![0x02, 0x01]);
        assert_eq!(be, vec![0x01, 0x02]);
    }

    #[test]
    fn test_typed_array_signed() {
        let arr = TypedArray::Int8(vec![-1, 5]);
        let mut bytes = Vec::new();
        arr.write::<LittleEndian>(&mut bytes);
        assert_eq!(bytes, vec![0xFF, 5]);
        assert_eq!(TypedArray::read::<LittleEndian>(ComponentType::Byte, &bytes), arr);
    }

    #[test]
    fn test_vectors_and_elements() {
        let prop = BinaryProperty::vectors(&[[1u16, 2, 3], [4, 5, 6]]);
        assert_eq!(prop.container, ContainerType::Vec3);
        assert_eq!(prop.len(), 2);
        assert_eq!(prop.byte_len(), 12);
        assert_eq!(prop.as_elements::<u16, 3>().unwrap(), &[[1, 2, 3], [4, 5, 6]]);
        assert!(prop.as_elements::<f32, 3>().is_none());
        assert!(prop.as_elements::<u16, 2>().is_none());
    }

    #[test]
    fn test_matrix_elements_flatten_to_scalars() {
        let boxes = [[0.5f32; 16]];
        let prop = BinaryProperty::vectors(&boxes);
        assert_eq!(prop.container, ContainerType::Scalar);
        assert_eq!(prop.values.len(), 16);
        assert_eq!(prop.as_elements::<f32, 16>().unwrap(), &boxes);
    }

    #[test]
    fn test_vec3_conversions() {
        let pts = [Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)];
        let prop = BinaryProperty::from_vec3(&pts);
        assert_eq!(prop.to_vec3().unwrap(), pts.to_vec());
        assert_eq!(prop.to_dvec3().unwrap()[1], DVec3::new(4.0, 5.0, 6.0));

        let dprop = BinaryProperty::from_dvec3(&[DVec3::new(0.5, 1.5, 2.5)]);
        assert_eq!(dprop.component_type(), ComponentType::Double);
        assert_eq!(dprop.to_vec3().unwrap(), vec![Vec3::new(0.5, 1.5, 2.5)]);
    }

    #[test]
    fn test_element_json() {
        let prop = BinaryProperty::vectors(&[[1u8, 2], [3, 4]]);
        assert_eq!(prop.element_json(1), Some(json!([3, 4])));
        assert_eq!(prop.element_json(2), None);

        let scalars = BinaryProperty::scalars(&[7u32, 9]);
        assert_eq!(scalars.element_json(0), Some(json!(7)));
        assert_eq!(scalars.to_u32_vec(), Some(vec![7, 9]));

        let inline = PropertyValue::Inline(vec![json!("door"), json!("roof")]);
        assert_eq!(inline.element_json(1), Some(json!("roof")));
        assert_eq!(inline.len(), 2);
    }
}
