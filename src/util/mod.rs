//! Utility types and functions shared by all tile formats.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Padding and alignment primitives
//! - Math type re-exports from glam

mod error;
mod padding;
mod math;

pub use error::*;
pub use padding::*;
pub use math::*;
