//! # tile3d
//!
//! Reader and writer for the 3D Tiles binary tile formats: batched models
//! (`b3dm`), instanced models (`i3dm`), point clouds (`pnts`), analytic
//! geometry (`geom`), vector data (`vctr`) and composites (`cmpt`).
//!
//! Every tile is a little-endian header, a feature table, a batch table and a
//! format-specific payload. Tables are a JSON header plus a binary body; the
//! codec resolves binary references into typed arrays on read and lays them
//! out again on write, so an unmodified tile round-trips byte for byte.
//!
//! ## Modules
//!
//! - [`util`] - Errors, padding and math types
//! - [`table`] - Feature and batch table codec
//! - [`encoding`] - Quantized positions, octahedron normals, zig-zag deltas, RGB565
//! - [`format`] - Headers, tile models, composite and registry
//! - [`io`] - File-level entry points
//!
//! ## Example
//!
//! ```ignore
//! use tile3d::prelude::*;
//!
//! let tile = tile3d::io::open("tile.pnts")?;
//! if let Some(pnts) = tile.downcast_ref::<Pnts>() {
//!     for p in pnts.world_positions()? {
//!         println!("{p}");
//!     }
//! }
//! ```

pub mod util;
pub mod table;
pub mod encoding;
pub mod format;
pub mod io;

// Re-export commonly used types
pub use util::{Error, ErrorKind, Result};
pub use format::{TileFormat, TileModel, TileRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, ErrorKind, Result};
    pub use crate::table::{BatchTable, BinaryProperty, FeatureTable, TableAccess, TypedArray};
    pub use crate::format::{
        B3dm, Cmpt, Geom, I3dm, InstancedModel, Pnts, TileFormat, TileModel, TileRegistry, Vctr,
    };
}
