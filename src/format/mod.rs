//! Tile formats.
//!
//! - [`TileHeader`] / [`I3dmHeader`] / [`VctrHeader`] / [`CmptHeader`] - fixed headers
//! - [`TileModel`] - common interface of every in-memory tile
//! - [`B3dm`] / [`I3dm`] / [`Pnts`] / [`Geom`] / [`Vctr`] - feature-bearing tiles
//! - [`Cmpt`] - composite of other tiles
//! - [`TileRegistry`] - magic-to-model dispatch
//! - [`names`] - feature table property names

mod header;
mod stream;
mod model;
mod gltf;
pub mod names;
mod b3dm;
mod i3dm;
mod pnts;
mod geom;
mod vctr;
mod cmpt;
mod registry;

pub use header::*;
pub use stream::TileWriter;
pub use model::{
    TileModel, BATCH_ID_COMPONENTS, FLOAT_COMPONENTS, UNSIGNED_BYTE_COMPONENTS, UNSIGNED_INT_COMPONENTS,
    UNSIGNED_SHORT_COMPONENTS,
};
pub use gltf::{glb_header, trim_glb, GLB_HEADER_SIZE, GLB_MAGIC};
pub use b3dm::*;
pub use i3dm::*;
pub use pnts::*;
pub use geom::*;
pub use vctr::*;
pub use cmpt::*;
pub use registry::*;
