//! Feature and batch tables.
//!
//! Both tables are a JSON header followed by a binary body. Header values
//! are literals or [`BinaryBodyReference`]s into the body; decoding turns
//! references into typed [`BinaryProperty`] arrays, encoding lays them back
//! out and rewrites the references.
//!
//! - [`ComponentType`] / [`ContainerType`] / [`DataType`] - storage types
//! - [`HeaderValue`] / [`PropertyValue`] / [`TypedArray`] - values
//! - [`BinaryBodyBuilder`] - layout accumulator
//! - [`FeatureTableCodec`] / [`SemanticCodec`] - per-format feature semantics
//! - [`FeatureTable`] / [`BatchTable`] - the two tables
//! - [`TableAccess`] - typed literal and property access

mod component;
mod data_type;
mod reference;
mod value;
mod header;
mod layout;
mod access;
mod semantic;
mod batch_id;
mod hierarchy;
mod feature_table;
mod batch_table;

pub use component::*;
pub use data_type::*;
pub use reference::{BinaryBodyReference, ReferenceShape};
pub use value::*;
pub use header::*;
pub use layout::*;
pub use access::*;
pub use semantic::*;
pub use batch_id::*;
pub use hierarchy::*;
pub use feature_table::*;
pub use batch_table::*;
