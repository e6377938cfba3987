//! Sparse persistent height-field store for SCM simulations.
//!
//! The deformable surface is sampled on an unbounded square lattice of
//! spacing `delta` laid out in the XY plane of a reference frame. Only
//! nodes that were ever touched are stored; everything else is answered
//! by the undeformed [`HeightSource`].
//!
//! # Contents
//!
//! - [`GridCoord`]: integer lattice coordinate with 4-connected neighbours
//! - [`GridNode`]: per-node deformation and soil state
//! - [`HeightSource`]: undeformed surface ([`FlatPatch`], [`Heightfield`])
//! - [`SpatialGrid`]: the persistent store plus frame transforms

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod coord;
pub mod error;
pub mod height;
pub mod node;
pub mod store;

pub use coord::GridCoord;
pub use error::GridError;
pub use height::{FlatPatch, HeightSource, Heightfield};
pub use node::{GridNode, NodeInfo};
pub use store::SpatialGrid;
