//! The sparse persistent node store.
//!
//! [`SpatialGrid`] maps lattice coordinates to [`GridNode`] records. The
//! store only grows: a node is created the first time it is hit or swept
//! into an erosion domain and lives for the whole simulation. Iteration
//! order is insertion order, so every consumer sees nodes in a
//! reproducible sequence.

use glam::{DVec2, DVec3};
use indexmap::IndexMap;
use scm_core::Frame;
use smallvec::SmallVec;

use crate::coord::GridCoord;
use crate::error::GridError;
use crate::height::HeightSource;
use crate::node::{GridNode, NodeInfo};

/// Sparse deformation store over an undeformed [`HeightSource`].
pub struct SpatialGrid {
    heights: Box<dyn HeightSource>,
    frame: Frame,
    delta: f64,
    nodes: IndexMap<GridCoord, GridNode>,
}

impl SpatialGrid {
    /// Create an empty store over `heights`, in the world frame.
    ///
    /// Returns `Err(GridError::InvalidSpacing)` if the source reports a
    /// non-positive or non-finite spacing.
    pub fn new(heights: Box<dyn HeightSource>) -> Result<Self, GridError> {
        let delta = heights.spacing();
        if !delta.is_finite() || delta <= 0.0 {
            return Err(GridError::InvalidSpacing { value: delta });
        }
        Ok(Self {
            heights,
            frame: Frame::IDENTITY,
            delta,
            nodes: IndexMap::new(),
        })
    }

    /// Lattice spacing.
    pub fn spacing(&self) -> f64 {
        self.delta
    }

    /// Area of one lattice cell, `delta²`.
    pub fn cell_area(&self) -> f64 {
        self.delta * self.delta
    }

    /// The reference frame of the lattice plane.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Replace the reference frame. Stored levels are frame-relative
    /// and are not transformed.
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    /// The undeformed surface.
    pub fn height_source(&self) -> &dyn HeightSource {
        self.heights.as_ref()
    }

    // ── Lattice-space queries ────────────────────────────────────

    /// Undeformed height at `c`.
    pub fn init_height(&self, c: GridCoord) -> f64 {
        self.heights.init_height(c)
    }

    /// Undeformed normal at `c`, in the reference frame.
    pub fn init_normal(&self, c: GridCoord) -> DVec3 {
        self.heights.init_normal(c)
    }

    /// Current height at `c`: the stored level, else the undeformed one.
    pub fn height(&self, c: GridCoord) -> f64 {
        match self.nodes.get(&c) {
            Some(node) => node.level,
            None => self.heights.init_height(c),
        }
    }

    /// Current normal at `c`, in the reference frame.
    ///
    /// Central differences of [`height`](Self::height) over the four
    /// neighbours; always the up vector over a flat source.
    pub fn normal(&self, c: GridCoord) -> DVec3 {
        if self.heights.is_flat() {
            return DVec3::Z;
        }
        let [s, w, e, n] = c.neighbours4().map(|nb| self.height(nb));
        DVec3::new(w - e, s - n, 2.0 * self.delta).normalize()
    }

    // ── Node access ──────────────────────────────────────────────

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if no node was ever stored.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `true` if a record exists for `c`.
    pub fn contains(&self, c: GridCoord) -> bool {
        self.nodes.contains_key(&c)
    }

    /// The stored record for `c`.
    pub fn node(&self, c: GridCoord) -> Option<&GridNode> {
        self.nodes.get(&c)
    }

    /// Mutable access to the stored record for `c`.
    pub fn node_mut(&mut self, c: GridCoord) -> Option<&mut GridNode> {
        self.nodes.get_mut(&c)
    }

    /// The record for `c`, created from the undeformed surface if absent.
    ///
    /// Returns the record and whether it was just created.
    pub fn get_or_insert_pristine(&mut self, c: GridCoord) -> (&mut GridNode, bool) {
        let heights = &self.heights;
        let mut created = false;
        let node = self.nodes.entry(c).or_insert_with(|| {
            created = true;
            GridNode::pristine(heights.init_height(c), heights.init_normal(c))
        });
        (node, created)
    }

    /// Store `node` at `c`, replacing any existing record.
    pub fn insert(&mut self, c: GridCoord, node: GridNode) {
        self.nodes.insert(c, node);
    }

    /// Stored neighbours of `c` among its four cardinal neighbours.
    pub fn stored_neighbours(&self, c: GridCoord) -> SmallVec<[GridCoord; 4]> {
        c.neighbours4()
            .into_iter()
            .filter(|nb| self.nodes.contains_key(nb))
            .collect()
    }

    /// All stored nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &GridNode)> + '_ {
        self.nodes.iter().map(|(c, n)| (*c, n))
    }

    // ── Frame transforms ─────────────────────────────────────────

    /// Planar position of `c` in the reference plane.
    pub fn planar_position(&self, c: GridCoord) -> DVec2 {
        DVec2::new(f64::from(c.i) * self.delta, f64::from(c.j) * self.delta)
    }

    /// Point above `c` at height `z`, in the reference frame.
    pub fn local_point(&self, c: GridCoord, z: f64) -> DVec3 {
        self.planar_position(c).extend(z)
    }

    /// Point above `c` at height `z`, in the world frame.
    pub fn world_point(&self, c: GridCoord, z: f64) -> DVec3 {
        self.frame.point_to_world(self.local_point(c, z))
    }

    /// Lattice node closest to the projection of `world` on the plane.
    pub fn nearest_coord(&self, world: DVec3) -> GridCoord {
        let local = self.frame.point_to_local(world);
        GridCoord::new(
            (local.x / self.delta).round() as i32,
            (local.y / self.delta).round() as i32,
        )
    }

    // ── World-space queries ──────────────────────────────────────

    /// World vertical coordinate of the current surface below `world`.
    pub fn world_height(&self, world: DVec3) -> f64 {
        let c = self.nearest_coord(world);
        self.surface_point(world, self.height(c)).z
    }

    /// World normal of the current surface below `world`.
    pub fn world_normal(&self, world: DVec3) -> DVec3 {
        self.frame.dir_to_world(self.normal(self.nearest_coord(world)))
    }

    /// World vertical coordinate of the undeformed surface below `world`.
    pub fn world_init_height(&self, world: DVec3) -> f64 {
        let c = self.nearest_coord(world);
        self.surface_point(world, self.init_height(c)).z
    }

    /// World normal of the undeformed surface below `world`.
    pub fn world_init_normal(&self, world: DVec3) -> DVec3 {
        self.frame
            .dir_to_world(self.init_normal(self.nearest_coord(world)))
    }

    /// Soil state at the node closest to `world`; zero if never touched.
    pub fn node_info(&self, world: DVec3) -> NodeInfo {
        self.nodes
            .get(&self.nearest_coord(world))
            .map(GridNode::info)
            .unwrap_or_default()
    }

    fn surface_point(&self, world: DVec3, z: f64) -> DVec3 {
        let mut local = self.frame.point_to_local(world);
        local.z = z;
        self.frame.point_to_world(local)
    }
}

impl std::fmt::Debug for SpatialGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialGrid")
            .field("delta", &self.delta)
            .field("frame", &self.frame)
            .field("flat", &self.heights.is_flat())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
