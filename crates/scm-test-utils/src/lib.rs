//! Mock scene and force sink for SCM soil model tests.
//!
//! [`MockScene`] answers probes against a handful of analytic shapes
//! (spheres and axis-aligned boxes) translating at constant velocity.
//! [`RecordingForceSink`] records every load it receives so tests can
//! assert on them.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};

use glam::DVec3;
use scm_core::{
    Aabb, ContactKind, ContactableSoilData, EntityId, ForceSink, Frame, NodeId, ProbeHit,
    SceneQuery,
};

/// Analytic collision shape of a mock body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MockShape {
    Sphere { radius: f64 },
    Cuboid { half_extents: DVec3 },
}

/// How a mock body reports itself to the soil model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MockContact {
    /// Rigid body; torques about its center.
    Rigid,
    /// Contact triangle with vertices at `offsets` from the body center.
    Triangle {
        nodes: [NodeId; 3],
        offsets: [DVec3; 3],
    },
    /// Generic loadable surface.
    Surface,
}

/// One body of a [`MockScene`].
#[derive(Clone, Debug, PartialEq)]
pub struct MockBody {
    pub id: EntityId,
    pub shape: MockShape,
    pub position: DVec3,
    pub velocity: DVec3,
    pub contact: MockContact,
    pub soil: Option<ContactableSoilData>,
}

impl MockBody {
    pub fn with_velocity(&mut self, velocity: DVec3) -> &mut Self {
        self.velocity = velocity;
        self
    }

    pub fn with_contact(&mut self, contact: MockContact) -> &mut Self {
        self.contact = contact;
        self
    }

    pub fn with_soil(&mut self, soil: ContactableSoilData) -> &mut Self {
        self.soil = Some(soil);
        self
    }

    pub fn aabb(&self) -> Aabb {
        match self.shape {
            MockShape::Sphere { radius } => Aabb::from_center(self.position, DVec3::splat(radius)),
            MockShape::Cuboid { half_extents } => Aabb::from_center(self.position, half_extents),
        }
    }

    pub fn contact_kind(&self) -> ContactKind {
        match self.contact {
            MockContact::Rigid => ContactKind::Rigid {
                reference_point: self.position,
            },
            MockContact::Triangle { nodes, offsets } => ContactKind::Triangle {
                nodes,
                vertices: offsets.map(|o| self.position + o),
            },
            MockContact::Surface => ContactKind::Surface,
        }
    }

    /// Segment parameter in `[0, 1]` of the first intersection with the
    /// segment `from -> to`. A segment starting inside hits at 0.
    pub fn intersect(&self, from: DVec3, to: DVec3) -> Option<f64> {
        let d = to - from;
        match self.shape {
            MockShape::Sphere { radius } => {
                let f = from - self.position;
                let c = f.length_squared() - radius * radius;
                if c <= 0.0 {
                    return Some(0.0);
                }
                let a = d.length_squared();
                let b = 2.0 * f.dot(d);
                let disc = b * b - 4.0 * a * c;
                if a == 0.0 || disc < 0.0 {
                    return None;
                }
                let t = (-b - disc.sqrt()) / (2.0 * a);
                (0.0..=1.0).contains(&t).then_some(t)
            }
            MockShape::Cuboid { half_extents } => {
                let lo = self.position - half_extents;
                let hi = self.position + half_extents;
                let mut tmin: f64 = 0.0;
                let mut tmax: f64 = 1.0;
                for axis in 0..3 {
                    if d[axis] == 0.0 {
                        if from[axis] < lo[axis] || from[axis] > hi[axis] {
                            return None;
                        }
                        continue;
                    }
                    let t1 = (lo[axis] - from[axis]) / d[axis];
                    let t2 = (hi[axis] - from[axis]) / d[axis];
                    tmin = tmin.max(t1.min(t2));
                    tmax = tmax.min(t1.max(t2));
                }
                (tmin <= tmax).then_some(tmin)
            }
        }
    }
}

/// A scene of analytic bodies. Counts the probes it answers.
#[derive(Debug, Default)]
pub struct MockScene {
    bodies: Vec<MockBody>,
    probes: AtomicUsize,
}

impl MockScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, id: EntityId, shape: MockShape, position: DVec3) -> &mut MockBody {
        self.bodies.push(MockBody {
            id,
            shape,
            position,
            velocity: DVec3::ZERO,
            contact: MockContact::Rigid,
            soil: None,
        });
        let last = self.bodies.len() - 1;
        &mut self.bodies[last]
    }

    pub fn add_sphere(&mut self, id: EntityId, center: DVec3, radius: f64) -> &mut MockBody {
        self.push(id, MockShape::Sphere { radius }, center)
    }

    pub fn add_box(&mut self, id: EntityId, center: DVec3, half_extents: DVec3) -> &mut MockBody {
        self.push(id, MockShape::Cuboid { half_extents }, center)
    }

    pub fn body(&self, id: EntityId) -> Option<&MockBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut MockBody> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn remove(&mut self, id: EntityId) {
        self.bodies.retain(|b| b.id != id);
    }

    /// Move every body by `velocity * dt`.
    pub fn advance(&mut self, dt: f64) {
        for b in &mut self.bodies {
            b.position += b.velocity * dt;
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }
}

impl SceneQuery for MockScene {
    fn probe(&self, from: DVec3, to: DVec3) -> Option<ProbeHit> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let mut best: Option<(f64, &MockBody)> = None;
        for b in &self.bodies {
            if let Some(t) = b.intersect(from, to) {
                if best.is_none_or(|(bt, _)| t < bt) {
                    best = Some((t, b));
                }
            }
        }
        best.map(|(t, b)| ProbeHit {
            entity: b.id,
            point: from + (to - from) * t,
            contact: b.contact_kind(),
        })
    }

    fn bounding_box(&self) -> Aabb {
        self.bodies
            .iter()
            .fold(Aabb::EMPTY, |acc, b| acc.union(&b.aabb()))
    }

    fn surface_velocity(&self, entity: EntityId, _point: DVec3) -> DVec3 {
        self.body(entity).map_or(DVec3::ZERO, |b| b.velocity)
    }

    fn pose(&self, entity: EntityId) -> Option<Frame> {
        self.body(entity).map(|b| Frame::from_translation(b.position))
    }

    fn soil_override(&self, entity: EntityId) -> Option<ContactableSoilData> {
        self.body(entity).and_then(|b| b.soil)
    }
}

/// A [`ForceSink`] that records every call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordingForceSink {
    pub body_loads: Vec<(EntityId, DVec3, DVec3)>,
    pub node_forces: Vec<(NodeId, DVec3)>,
    pub surface_loads: Vec<(EntityId, DVec3, (f64, f64))>,
}

impl RecordingForceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.body_loads.is_empty() && self.node_forces.is_empty() && self.surface_loads.is_empty()
    }

    pub fn clear(&mut self) {
        self.body_loads.clear();
        self.node_forces.clear();
        self.surface_loads.clear();
    }

    /// Sum of all forces applied to `entity` as body loads.
    pub fn total_body_force(&self, entity: EntityId) -> DVec3 {
        self.body_loads
            .iter()
            .filter(|(e, _, _)| *e == entity)
            .map(|(_, f, _)| *f)
            .sum()
    }
}

impl ForceSink for RecordingForceSink {
    fn apply_body_load(&mut self, entity: EntityId, force: DVec3, torque: DVec3) {
        self.body_loads.push((entity, force, torque));
    }

    fn apply_node_force(&mut self, node: NodeId, force: DVec3) {
        self.node_forces.push((node, force));
    }

    fn register_surface_load(&mut self, entity: EntityId, force: DVec3, uv: (f64, f64)) {
        self.surface_loads.push((entity, force, uv));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upward_probe_hits_sphere_bottom() {
        let mut s = MockScene::new();
        s.add_sphere(EntityId(1), DVec3::new(0.0, 0.0, 1.0), 0.5);
        let hit = s
            .probe(DVec3::new(0.0, 0.0, -1.0), DVec3::new(0.0, 0.0, 2.0))
            .expect("hit");
        assert!((hit.point.z - 0.5).abs() < 1e-12);
        assert_eq!(s.probe_count(), 1);
    }

    #[test]
    fn nearest_body_wins() {
        let mut s = MockScene::new();
        s.add_box(EntityId(1), DVec3::new(0.0, 0.0, 1.0), DVec3::splat(0.1));
        s.add_box(EntityId(2), DVec3::new(0.0, 0.0, 0.5), DVec3::splat(0.1));
        let hit = s
            .probe(DVec3::new(0.0, 0.0, 0.0), DVec3::new(0.0, 0.0, 2.0))
            .expect("hit");
        assert_eq!(hit.entity, EntityId(2));
        assert!((hit.point.z - 0.4).abs() < 1e-12);
    }

    #[test]
    fn short_probe_misses() {
        let mut s = MockScene::new();
        s.add_sphere(EntityId(1), DVec3::new(0.0, 0.0, 1.0), 0.1);
        assert!(s.probe(DVec3::ZERO, DVec3::new(0.0, 0.0, 0.5)).is_none());
    }

    #[test]
    fn bounding_box_covers_all_bodies() {
        let mut s = MockScene::new();
        assert!(s.bounding_box().is_inverted());
        s.add_sphere(EntityId(1), DVec3::ZERO, 1.0);
        s.add_box(EntityId(2), DVec3::new(3.0, 0.0, 0.0), DVec3::splat(0.5));
        let bb = s.bounding_box();
        assert_eq!(bb.min, DVec3::new(-1.0, -1.0, -1.0));
        assert_eq!(bb.max, DVec3::new(3.5, 1.0, 1.0));
    }

    #[test]
    fn advance_moves_bodies_and_triangles() {
        let mut s = MockScene::new();
        s.add_sphere(EntityId(1), DVec3::ZERO, 0.1)
            .with_velocity(DVec3::X)
            .with_contact(MockContact::Triangle {
                nodes: [NodeId(1), NodeId(2), NodeId(3)],
                offsets: [DVec3::ZERO, DVec3::X, DVec3::Y],
            });
        s.advance(0.5);
        let b = s.body(EntityId(1)).expect("body");
        assert_eq!(b.position, DVec3::new(0.5, 0.0, 0.0));
        match b.contact_kind() {
            ContactKind::Triangle { vertices, .. } => {
                assert_eq!(vertices[1], DVec3::new(1.5, 0.0, 0.0));
            }
            other => panic!("unexpected contact kind {other:?}"),
        }
    }

    #[test]
    fn recording_sink_sums_body_forces() {
        let mut sink = RecordingForceSink::new();
        sink.apply_body_load(EntityId(1), DVec3::X, DVec3::ZERO);
        sink.apply_body_load(EntityId(1), DVec3::Y, DVec3::ZERO);
        sink.apply_body_load(EntityId(2), DVec3::Z, DVec3::ZERO);
        assert_eq!(sink.total_body_force(EntityId(1)), DVec3::new(1.0, 1.0, 0.0));
        sink.clear();
        assert!(sink.is_empty());
    }
}
