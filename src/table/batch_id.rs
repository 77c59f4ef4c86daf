//! Batch id storage width selection.

use super::{BinaryProperty, ComponentType};

/// Narrowest unsigned component type for batch ids whose maximum is `max`.
///
/// The 8-bit form covers ids up to 254; from 255 the 16-bit form is used,
/// and above 65535 the 32-bit form.
pub const fn batch_id_component_type(max: u32) -> ComponentType {
    if max < 0xFF {
        ComponentType::UnsignedByte
    } else if max <= 0xFFFF {
        ComponentType::UnsignedShort
    } else {
        ComponentType::UnsignedInt
    }
}

/// Batch ids stored in the narrowest sufficient width.
pub fn batch_id_property(ids: &[u32]) -> BinaryProperty {
    let max = ids.iter().copied().max().unwrap_or(0);
    match batch_id_component_type(max) {
        ComponentType::UnsignedByte => {
            BinaryProperty::scalars(&ids.iter().map(|&id| id as u8).collect::<Vec<_>>())
        }
        ComponentType::UnsignedShort => {
            BinaryProperty::scalars(&ids.iter().map(|&id| id as u16).collect::<Vec<_>>())
        }
        _ => BinaryProperty::scalars(ids),
    }
}
