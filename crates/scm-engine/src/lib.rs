//! Per-step contact pipeline of the SCM deformable soil model.
//!
//! Provides [`SoilTerrain`], which probes the scene below every active
//! grid node, groups the contacts into patches, evolves the soil state
//! of each contacted node and hands the resulting forces to a
//! [`ForceSink`](scm_core::ForceSink). An optional bulldozing stage
//! moves displaced soil to the sides of ruts.
//!
//! Only the probing stage runs in parallel; every other stage is
//! sequential because the soil state is path dependent.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bulldozing;
pub mod config;
pub mod domain;
pub mod forces;
pub mod metrics;
pub mod patch;
pub mod raycast;
pub mod soil;
pub mod terrain;

pub use config::{Boundary, BulldozingConfig, ConfigError, ProbeConfig, TerrainConfig};
pub use domain::{ActiveDomain, ActiveDomainTracker, CoordRange};
pub use forces::{BodyLoad, ForceLedger};
pub use metrics::{StepMetrics, StepReport};
pub use patch::ContactPatch;
pub use raycast::{HitRecord, HitSet, RayCaster};
pub use soil::{ContactForce, ContactInput};
pub use terrain::{SoilTerrain, SoilTerrainBuilder, StepError, DEFAULT_FRICTION_COEFFICIENT};
