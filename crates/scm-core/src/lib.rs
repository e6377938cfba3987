//! Core types and traits for the SCM deformable soil model.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the grid store and the contact engine:
//! entity identifiers, the reference [`Frame`], soil parameter records,
//! and the traits through which the soil model talks to the outside
//! world (scene queries, force sinks, parameter callbacks).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod frame;
pub mod id;
pub mod soil;
pub mod traits;

pub use frame::{Aabb, Frame};
pub use id::{EntityId, NodeId};
pub use soil::{ContactableSoilData, ResolvedSoil, SoilParameters};
pub use traits::{
    ContactKind, ForceSink, FrictionCallback, NullForceSink, ProbeHit, SceneQuery,
    SoilParametersCallback,
};

/// Re-export of the vector math types used throughout the API.
pub use glam::{DQuat, DVec2, DVec3};
