//! SCM: a deformable soil contact model for vehicle and multibody simulation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! SCM sub-crates. For most users, adding `scm` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use scm::prelude::*;
//!
//! // A 40 cm square plate whose underside sits 1 cm below the ground.
//! struct Plate;
//! impl SceneQuery for Plate {
//!     fn probe(&self, from: DVec3, to: DVec3) -> Option<ProbeHit> {
//!         let inside = from.x.abs() <= 0.2 && from.y.abs() <= 0.2;
//!         (inside && from.z <= -0.01 && to.z >= -0.01).then(|| ProbeHit {
//!             entity: EntityId(1),
//!             point: DVec3::new(from.x, from.y, -0.01),
//!             contact: ContactKind::Rigid { reference_point: DVec3::ZERO },
//!         })
//!     }
//!     fn bounding_box(&self) -> Aabb {
//!         Aabb::new(DVec3::new(-0.2, -0.2, -0.01), DVec3::new(0.2, 0.2, 0.05))
//!     }
//!     fn surface_velocity(&self, _entity: EntityId, _point: DVec3) -> DVec3 {
//!         DVec3::ZERO
//!     }
//!     fn pose(&self, _entity: EntityId) -> Option<Frame> {
//!         Some(Frame::IDENTITY)
//!     }
//! }
//!
//! let mut terrain = SoilTerrain::builder(TerrainConfig::default())
//!     .heights(FlatPatch::new(2.0, 2.0, 0.05).unwrap())
//!     .scene(Plate)
//!     .build()
//!     .unwrap();
//! terrain.step(1e-3, &mut NullForceSink).unwrap();
//! assert!(terrain.num_ray_hits() > 0);
//! let load = terrain.body_force(EntityId(1)).unwrap();
//! assert!(load.force.z > 0.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `scm-core` | IDs, frames, soil parameters, collaborator traits |
//! | [`grid`] | `scm-grid` | Lattice coordinates, node state, height sources |
//! | [`engine`] | `scm-engine` | The terrain, its configuration and its stages |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`scm-core`).
///
/// The host implements [`types::SceneQuery`] and [`types::ForceSink`];
/// location-dependent soil comes through [`types::SoilParametersCallback`].
pub use scm_core as types;

/// Sparse height-field store (`scm-grid`).
///
/// Undeformed surfaces are described by a [`grid::HeightSource`]:
/// [`grid::FlatPatch`] or a sampled [`grid::Heightfield`].
pub use scm_grid as grid;

/// The per-step contact pipeline (`scm-engine`).
///
/// [`engine::SoilTerrain`] drives everything; the stage modules are
/// public for hosts that want to run pieces on their own.
pub use scm_engine as engine;

/// Common imports for typical SCM usage.
///
/// ```rust
/// use scm::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use scm_core::{
        Aabb, ContactKind, ContactableSoilData, DQuat, DVec2, DVec3, EntityId, ForceSink, Frame,
        FrictionCallback, NodeId, NullForceSink, ProbeHit, SceneQuery, SoilParameters,
        SoilParametersCallback,
    };

    // Grid
    pub use scm_grid::{FlatPatch, GridCoord, HeightSource, Heightfield, NodeInfo};

    // Errors
    pub use scm_engine::{ConfigError, StepError};
    pub use scm_grid::GridError;

    // Engine
    pub use scm_engine::{
        BodyLoad, BulldozingConfig, ProbeConfig, SoilTerrain, StepMetrics, StepReport,
        TerrainConfig,
    };
}
