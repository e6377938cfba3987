//! Per-step force ledgers.
//!
//! Node forces from the soil model are summed per rigid entity (force
//! plus torque about its reference point), per flexible vertex (split
//! barycentrically over the contacted triangle), and per generic surface.
//! The ledgers are cleared at the start of every step and, outside
//! co-simulation mode, flushed into a [`ForceSink`] at its end.

use glam::DVec3;
use indexmap::IndexMap;
use scm_core::{ContactKind, EntityId, ForceSink, NodeId};

/// Parametric location at which generic surface loads are applied.
pub const SURFACE_LOAD_UV: (f64, f64) = (0.5, 0.5);

/// Resultant load on a rigid entity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyLoad {
    /// Resultant force (world frame).
    pub force: DVec3,
    /// Resultant torque about the entity's reference point (world frame).
    pub torque: DVec3,
}

/// Accumulated contact forces of one step.
#[derive(Clone, Debug, Default)]
pub struct ForceLedger {
    bodies: IndexMap<EntityId, BodyLoad>,
    nodes: IndexMap<NodeId, DVec3>,
    surfaces: IndexMap<EntityId, DVec3>,
}

impl ForceLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything accumulated so far.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.nodes.clear();
        self.surfaces.clear();
    }

    /// `true` if nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty() && self.nodes.is_empty() && self.surfaces.is_empty()
    }

    /// Add `force`, applied at world point `point`, to `entity`.
    ///
    /// Generic surface loads are also registered with `sink` right away
    /// unless `cosim` is set.
    pub fn accumulate(
        &mut self,
        entity: EntityId,
        contact: &ContactKind,
        point: DVec3,
        force: DVec3,
        cosim: bool,
        sink: &mut dyn ForceSink,
    ) {
        match contact {
            ContactKind::Rigid { reference_point } => {
                let load = self.bodies.entry(entity).or_default();
                load.force += force;
                load.torque += (point - *reference_point).cross(force);
            }
            ContactKind::Triangle { nodes, vertices } => {
                let w = barycentric(point, vertices);
                for (node, weight) in nodes.iter().zip(w) {
                    *self.nodes.entry(*node).or_insert(DVec3::ZERO) += weight * force;
                }
            }
            ContactKind::Surface => {
                if !cosim {
                    sink.register_surface_load(entity, force, SURFACE_LOAD_UV);
                }
                *self.surfaces.entry(entity).or_insert(DVec3::ZERO) += force;
            }
        }
    }

    /// Hand the rigid and flexible ledgers to `sink`, in accumulation order.
    ///
    /// Surface loads are not repeated; they were registered as they
    /// were accumulated.
    pub fn flush(&self, sink: &mut dyn ForceSink) {
        for (entity, load) in &self.bodies {
            sink.apply_body_load(*entity, load.force, load.torque);
        }
        for (node, force) in &self.nodes {
            sink.apply_node_force(*node, *force);
        }
    }

    /// Load accumulated on a rigid entity.
    pub fn body_force(&self, entity: EntityId) -> Option<BodyLoad> {
        self.bodies.get(&entity).copied()
    }

    /// Force accumulated on a flexible vertex.
    pub fn node_force(&self, node: NodeId) -> Option<DVec3> {
        self.nodes.get(&node).copied()
    }

    /// Force accumulated on a generic surface.
    pub fn surface_force(&self, entity: EntityId) -> Option<DVec3> {
        self.surfaces.get(&entity).copied()
    }

    /// All rigid entity loads, in accumulation order.
    pub fn body_forces(&self) -> impl Iterator<Item = (EntityId, BodyLoad)> + '_ {
        self.bodies.iter().map(|(e, l)| (*e, *l))
    }

    /// All flexible vertex forces, in accumulation order.
    pub fn node_forces(&self) -> impl Iterator<Item = (NodeId, DVec3)> + '_ {
        self.nodes.iter().map(|(n, f)| (*n, *f))
    }
}

/// Barycentric weights of the projection of `p` onto triangle `tri`.
///
/// Degenerate triangles split evenly between their vertices.
pub fn barycentric(p: DVec3, tri: &[DVec3; 3]) -> [f64; 3] {
    let [a, b, c] = *tri;
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= f64::EPSILON * d00 * d11 {
        return [1.0 / 3.0; 3];
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    [1.0 - v - w, v, w]
}
