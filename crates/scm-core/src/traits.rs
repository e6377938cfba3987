//! Collaborator traits: everything the soil model consumes from, or
//! hands back to, the surrounding simulation.

use glam::DVec3;

use crate::frame::{Aabb, Frame};
use crate::id::{EntityId, NodeId};
use crate::soil::{ContactableSoilData, SoilParameters};

/// How forces on a contacted entity are applied.
///
/// Resolved once per probe hit by the scene-query provider, so the force
/// accumulator can dispatch on the tag instead of inspecting types.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContactKind {
    /// A rigid body. Torques are taken about `reference_point` (world frame).
    Rigid {
        /// Point about which the resultant torque is accumulated.
        reference_point: DVec3,
    },
    /// A flexible contact triangle. Forces are split barycentrically
    /// between its three vertices.
    Triangle {
        /// Vertex handles, in the same order as `vertices`.
        nodes: [NodeId; 3],
        /// Current vertex positions in the world frame.
        vertices: [DVec3; 3],
    },
    /// A generic loadable surface. Forces are registered as surface loads.
    Surface,
}

/// Result of a successful probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeHit {
    /// The entity that was hit.
    pub entity: EntityId,
    /// Hit point in the world frame.
    pub point: DVec3,
    /// How forces on this entity are applied.
    pub contact: ContactKind,
}

/// Geometric queries against the scene of collidable entities.
///
/// Probes are issued concurrently from several worker threads, hence the
/// `Sync` bound. Implementations must not block indefinitely.
pub trait SceneQuery: Send + Sync {
    /// First intersection of the segment travelling from `from` to `to`.
    fn probe(&self, from: DVec3, to: DVec3) -> Option<ProbeHit>;

    /// World bounding box of all collidable geometry.
    ///
    /// Return [`Aabb::EMPTY`] (or any inverted box) for an empty scene.
    fn bounding_box(&self) -> Aabb;

    /// Velocity of the surface of `entity` at world point `point`.
    fn surface_velocity(&self, entity: EntityId, point: DVec3) -> DVec3;

    /// Current pose of `entity`, or `None` if it is unknown.
    fn pose(&self, entity: EntityId) -> Option<Frame>;

    /// Soil-contactable interaction properties declared by `entity`.
    fn soil_override(&self, entity: EntityId) -> Option<ContactableSoilData> {
        let _ = entity;
        None
    }
}

/// Receiver of the forces produced by the soil model.
pub trait ForceSink {
    /// Apply a resultant force and torque to a rigid entity.
    fn apply_body_load(&mut self, entity: EntityId, force: DVec3, torque: DVec3);

    /// Apply a force to a vertex of a flexible surface.
    fn apply_node_force(&mut self, node: NodeId, force: DVec3);

    /// Register a force on a generic loadable surface at parametric
    /// location `uv`.
    fn register_surface_load(&mut self, entity: EntityId, force: DVec3, uv: (f64, f64));
}

/// A [`ForceSink`] that discards everything.
///
/// Useful in co-simulation mode, where forces are polled from the
/// terrain's ledgers instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullForceSink;

impl ForceSink for NullForceSink {
    fn apply_body_load(&mut self, _entity: EntityId, _force: DVec3, _torque: DVec3) {}
    fn apply_node_force(&mut self, _node: NodeId, _force: DVec3) {}
    fn register_surface_load(&mut self, _entity: EntityId, _force: DVec3, _uv: (f64, f64)) {}
}

/// Location-dependent soil parameters.
///
/// Overrides the global [`SoilParameters`] at every hit node. The query
/// point is expressed in the terrain's reference frame.
pub trait SoilParametersCallback: Send + Sync {
    /// Soil parameters below `local_point`. All fields must be set.
    fn parameters(&self, local_point: DVec3) -> SoilParameters;
}

impl<F> SoilParametersCallback for F
where
    F: Fn(DVec3) -> SoilParameters + Send + Sync,
{
    fn parameters(&self, local_point: DVec3) -> SoilParameters {
        self(local_point)
    }
}

/// Location-dependent coefficient of friction of the terrain surface.
///
/// Consumed by tire and contact models that only need a scalar friction
/// value. The query point is a world point.
pub trait FrictionCallback: Send + Sync {
    /// Coefficient of friction below `loc`.
    fn coefficient(&self, loc: DVec3) -> f64;
}

impl<F> FrictionCallback for F
where
    F: Fn(DVec3) -> f64 + Send + Sync,
{
    fn coefficient(&self, loc: DVec3) -> f64 {
        self(loc)
    }
}
