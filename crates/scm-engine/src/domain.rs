//! Active domains: the regions of the grid that are probed each step.
//!
//! A domain is either attached to a tracked entity (an oriented box in
//! that entity's frame) or the single default domain spanning the
//! bounding box of all collidable geometry. Each step, every domain is
//! projected onto the reference plane and converted into an inclusive
//! range of lattice coordinates.

use glam::{DVec2, DVec3};
use scm_core::{Aabb, EntityId, Frame, SceneQuery};
use scm_grid::GridCoord;

/// Inverse direction used for axes the probe is parallel to.
const PARALLEL_INV_DIR: f64 = 1e10;

/// Inclusive rectangle of lattice coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordRange {
    /// Smallest `i`.
    pub i_min: i32,
    /// Largest `i`.
    pub i_max: i32,
    /// Smallest `j`.
    pub j_min: i32,
    /// Largest `j`.
    pub j_max: i32,
}

impl CoordRange {
    /// The range containing no coordinate.
    pub const EMPTY: Self = Self {
        i_min: 0,
        i_max: -1,
        j_min: 0,
        j_max: -1,
    };

    /// Lattice nodes whose planar position lies in `[min, max]`.
    ///
    /// Lower bounds round up and upper bounds round down, so only nodes
    /// strictly covered by the footprint are included.
    pub fn from_footprint(min: DVec2, max: DVec2, delta: f64) -> Self {
        if !min.is_finite() || !max.is_finite() || min.cmpgt(max).any() {
            return Self::EMPTY;
        }
        Self {
            i_min: (min.x / delta).ceil() as i32,
            i_max: (max.x / delta).floor() as i32,
            j_min: (min.y / delta).ceil() as i32,
            j_max: (max.y / delta).floor() as i32,
        }
    }

    /// `true` if no coordinate is covered.
    pub fn is_empty(&self) -> bool {
        self.i_min > self.i_max || self.j_min > self.j_max
    }

    /// Number of covered coordinates.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let nx = (i64::from(self.i_max) - i64::from(self.i_min) + 1) as u64;
        let ny = (i64::from(self.j_max) - i64::from(self.j_min) + 1) as u64;
        usize::try_from(nx.saturating_mul(ny)).unwrap_or(usize::MAX)
    }

    /// Covered coordinates, `i` varying fastest.
    pub fn iter(&self) -> impl Iterator<Item = GridCoord> + '_ {
        let (i_min, i_max) = (self.i_min, self.i_max);
        let rows = if self.is_empty() {
            1..=0
        } else {
            self.j_min..=self.j_max
        };
        rows.flat_map(move |j| (i_min..=i_max).map(move |i| GridCoord::new(i, j)))
    }
}

/// Quick-rejection test of a vertical probe against an oriented box.
///
/// Conservative: a `false` answer guarantees the probe cannot hit
/// anything inside the box; a `true` answer proves nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxTest {
    pose: Frame,
    center: DVec3,
    half_extents: DVec3,
    inv_dir: DVec3,
}

impl BoxTest {
    fn new(pose: Frame, center: DVec3, half_extents: DVec3, probe_dir: DVec3) -> Self {
        let dir = pose.dir_to_local(probe_dir);
        let inv = |d: f64| if d == 0.0 { PARALLEL_INV_DIR } else { 1.0 / d };
        Self {
            pose,
            center,
            half_extents,
            inv_dir: DVec3::new(inv(dir.x), inv(dir.y), inv(dir.z)),
        }
    }

    /// Slab test of the half-line starting at world point `from`.
    pub fn may_hit(&self, from: DVec3) -> bool {
        let orig = self.pose.point_to_local(from) - self.center;
        let t1 = (-self.half_extents - orig) * self.inv_dir;
        let t2 = (self.half_extents - orig) * self.inv_dir;
        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();
        tmax >= 0.0 && tmin <= tmax
    }
}

/// One region of the grid probed each step.
#[derive(Clone, Debug)]
pub struct ActiveDomain {
    entity: Option<EntityId>,
    center: DVec3,
    half_extents: DVec3,
    range: CoordRange,
    box_test: Option<BoxTest>,
}

impl ActiveDomain {
    fn default_domain() -> Self {
        Self {
            entity: None,
            center: DVec3::ZERO,
            half_extents: DVec3::ZERO,
            range: CoordRange::EMPTY,
            box_test: None,
        }
    }

    /// Tracked entity, or `None` for the default domain.
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    /// Box center (entity frame for attached domains, world otherwise).
    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Box half extents.
    pub fn half_extents(&self) -> DVec3 {
        self.half_extents
    }

    /// Coordinates covered this step.
    pub fn range(&self) -> &CoordRange {
        &self.range
    }

    /// Quick-rejection helper; only present for attached domains whose
    /// entity pose was known this step.
    pub fn box_test(&self) -> Option<&BoxTest> {
        self.box_test.as_ref()
    }

    fn update_attached(&mut self, pose: Option<Frame>, plane: &Frame, delta: f64) {
        let Some(pose) = pose else {
            self.range = CoordRange::EMPTY;
            self.box_test = None;
            return;
        };
        let corners = Aabb::from_center(self.center, self.half_extents)
            .corners()
            .map(|c| pose.point_to_world(c));
        self.range = footprint(&corners, plane, delta);
        self.box_test = Some(BoxTest::new(
            pose,
            self.center,
            self.half_extents,
            plane.axis_z(),
        ));
    }

    fn update_default(&mut self, bbox: Aabb, plane: &Frame, delta: f64) {
        if bbox.is_inverted() {
            self.center = DVec3::ZERO;
            self.half_extents = DVec3::ZERO;
            self.range = CoordRange::EMPTY;
            return;
        }
        self.center = bbox.center();
        self.half_extents = bbox.half_extents();
        self.range = footprint(&bbox.corners(), plane, delta);
    }
}

fn footprint(world_corners: &[DVec3; 8], plane: &Frame, delta: f64) -> CoordRange {
    let mut min = DVec2::splat(f64::MAX);
    let mut max = DVec2::splat(f64::MIN);
    for c in world_corners {
        let p = plane.point_to_local(*c).truncate();
        min = min.min(p);
        max = max.max(p);
    }
    CoordRange::from_footprint(min, max, delta)
}

/// The set of active domains.
///
/// Holds exactly one default domain until the first attached domain is
/// added; from then on only attached domains exist.
#[derive(Clone, Debug)]
pub struct ActiveDomainTracker {
    domains: Vec<ActiveDomain>,
    attached: bool,
}

impl Default for ActiveDomainTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveDomainTracker {
    /// A tracker holding only the default domain.
    pub fn new() -> Self {
        Self {
            domains: vec![ActiveDomain::default_domain()],
            attached: false,
        }
    }

    /// Attach a box of size `dims` centered at `center` (both in the
    /// entity's frame) to `entity`. The first call removes the default
    /// domain.
    pub fn add(&mut self, entity: EntityId, center: DVec3, dims: DVec3) {
        if !self.attached {
            self.domains.clear();
            self.attached = true;
        }
        self.domains.push(ActiveDomain {
            entity: Some(entity),
            center,
            half_extents: 0.5 * dims.abs(),
            range: CoordRange::EMPTY,
            box_test: None,
        });
    }

    /// `true` once an attached domain has been added.
    pub fn has_attached(&self) -> bool {
        self.attached
    }

    /// All domains, in the order they were added.
    pub fn domains(&self) -> &[ActiveDomain] {
        &self.domains
    }

    /// Recompute every domain's coordinate range for the current scene.
    pub fn update<Q: SceneQuery + ?Sized>(&mut self, scene: &Q, plane: &Frame, delta: f64) {
        if self.attached {
            for d in &mut self.domains {
                let pose = d.entity.and_then(|e| scene.pose(e));
                d.update_attached(pose, plane, delta);
            }
        } else {
            let bbox = scene.bounding_box();
            for d in &mut self.domains {
                d.update_default(bbox, plane, delta);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DQuat;
    use scm_test_utils::MockScene;

    #[test]
    fn footprint_rounds_inwards() {
        let r = CoordRange::from_footprint(DVec2::new(-0.25, -0.1), DVec2::new(0.25, 0.1), 0.1);
        assert_eq!(
            r,
            CoordRange {
                i_min: -2,
                i_max: 2,
                j_min: -1,
                j_max: 1
            }
        );
        assert_eq!(r.len(), 15);
        assert_eq!(r.iter().count(), 15);
        assert_eq!(r.iter().next(), Some(GridCoord::new(-2, -1)));
        assert_eq!(r.iter().nth(1), Some(GridCoord::new(-1, -1)));
    }

    #[test]
    fn degenerate_footprints_are_empty() {
        assert!(CoordRange::from_footprint(DVec2::ONE, DVec2::ZERO, 0.1).is_empty());
        assert!(CoordRange::from_footprint(DVec2::ZERO, DVec2::splat(f64::NAN), 0.1).is_empty());
        // Between two nodes: nothing covered.
        let r = CoordRange::from_footprint(DVec2::splat(0.01), DVec2::splat(0.09), 0.1);
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
        assert_eq!(r.iter().count(), 0);
    }

    #[test]
    fn huge_footprint_len_saturates() {
        let r = CoordRange::from_footprint(DVec2::splat(-1e300), DVec2::splat(1e300), 0.1);
        assert_eq!(r.i_min, i32::MIN);
        assert_eq!(r.i_max, i32::MAX);
        assert_eq!(r.len(), usize::MAX);
    }

    #[test]
    fn tracker_starts_with_single_default_domain() {
        let t = ActiveDomainTracker::new();
        assert_eq!(t.domains().len(), 1);
        assert!(t.domains()[0].entity().is_none());
        assert!(!t.has_attached());
    }

    #[test]
    fn first_attached_domain_replaces_default() {
        let mut t = ActiveDomainTracker::new();
        t.add(EntityId(1), DVec3::ZERO, DVec3::ONE);
        t.add(EntityId(2), DVec3::ZERO, DVec3::ONE);
        assert_eq!(t.domains().len(), 2);
        assert!(t.domains().iter().all(|d| d.entity().is_some()));
        assert_eq!(t.domains()[0].half_extents(), DVec3::splat(0.5));
    }

    #[test]
    fn default_domain_follows_scene_bounds() {
        let mut scene = MockScene::new();
        scene.add_sphere(EntityId(1), DVec3::new(0.0, 0.0, 0.2), 0.2);
        let mut t = ActiveDomainTracker::new();
        t.update(&scene, &Frame::IDENTITY, 0.1);
        let d = &t.domains()[0];
        assert_eq!(
            *d.range(),
            CoordRange {
                i_min: -2,
                i_max: 2,
                j_min: -2,
                j_max: 2
            }
        );
        assert!(d.box_test().is_none());
    }

    #[test]
    fn default_domain_empty_scene_covers_nothing() {
        let scene = MockScene::new();
        let mut t = ActiveDomainTracker::new();
        t.update(&scene, &Frame::IDENTITY, 0.1);
        assert!(t.domains()[0].range().is_empty());
    }

    #[test]
    fn attached_domain_moves_with_entity() {
        let mut scene = MockScene::new();
        scene.add_sphere(EntityId(7), DVec3::new(1.0, 0.0, 0.5), 0.1);
        let mut t = ActiveDomainTracker::new();
        t.add(EntityId(7), DVec3::ZERO, DVec3::new(1.0, 0.5, 1.0));
        t.update(&scene, &Frame::IDENTITY, 0.25);
        let r = *t.domains()[0].range();
        assert_eq!((r.i_min, r.i_max, r.j_min, r.j_max), (2, 6, -1, 1));
    }

    #[test]
    fn attached_domain_without_pose_is_empty() {
        let scene = MockScene::new();
        let mut t = ActiveDomainTracker::new();
        t.add(EntityId(99), DVec3::ZERO, DVec3::ONE);
        t.update(&scene, &Frame::IDENTITY, 0.1);
        assert!(t.domains()[0].range().is_empty());
        assert!(t.domains()[0].box_test().is_none());
    }

    #[test]
    fn rotated_plane_projects_corners() {
        let mut scene = MockScene::new();
        scene.add_box(EntityId(1), DVec3::ZERO, DVec3::new(0.6, 0.1, 0.1));
        let mut t = ActiveDomainTracker::new();
        let plane = Frame::new(DVec3::ZERO, DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2));
        t.update(&scene, &plane, 0.25);
        let r = *t.domains()[0].range();
        // Long axis of the box now runs along the plane's Y.
        assert_eq!((r.i_min, r.i_max), (0, 0));
        assert_eq!((r.j_min, r.j_max), (-2, 2));
    }

    #[test]
    fn box_test_rejects_probe_beside_box() {
        let pose = Frame::from_translation(DVec3::new(0.0, 0.0, 1.0));
        let bt = BoxTest::new(pose, DVec3::ZERO, DVec3::splat(0.5), DVec3::Z);
        assert!(bt.may_hit(DVec3::new(0.0, 0.0, 0.0)));
        assert!(!bt.may_hit(DVec3::new(2.0, 0.0, 0.0)));
        // Half-line starting above the box never reaches it.
        assert!(!bt.may_hit(DVec3::new(0.0, 0.0, 3.0)));
    }

    #[test]
    fn box_test_handles_tilted_box() {
        let pose = Frame::new(
            DVec3::new(0.0, 0.0, 1.0),
            DQuat::from_rotation_y(std::f64::consts::FRAC_PI_4),
        );
        let bt = BoxTest::new(pose, DVec3::ZERO, DVec3::new(1.0, 0.2, 0.2), DVec3::Z);
        assert!(bt.may_hit(DVec3::new(0.6, 0.0, 0.0)));
        assert!(!bt.may_hit(DVec3::new(0.6, 0.5, 0.0)));
    }
}
