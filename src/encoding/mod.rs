//! Compact encodings for positions, normals and colors.
//!
//! - [`quantization`] - 16-bit quantized positions
//! - [`octahedron`] - octahedron-encoded normals
//! - [`zigzag`] - zig-zag delta coded vector tile positions
//! - [`color`] - RGB565 colors

pub mod quantization;
pub mod octahedron;
pub mod zigzag;
pub mod color;

pub use quantization::*;
pub use octahedron::*;
pub use zigzag::*;
pub use color::*;
