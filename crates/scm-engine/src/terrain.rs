//! The deformable terrain and its per-step pipeline.
//!
//! [`SoilTerrain`] owns the persistent grid store and drives one step as
//! a fixed sequence of phases:
//!
//! 1. reset the transient state left by the previous step
//! 2. update active domains
//! 3. probe them and merge the hits ([`RayCaster`])
//! 4. group hits into contact patches
//! 5. evaluate the soil response at each hit node and accumulate forces
//! 6. optionally bulldoze displaced soil to the sides
//!
//! `step()` takes `&mut self`, so two steps on one terrain can never
//! overlap.

use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

use glam::{DVec2, DVec3};
use indexmap::IndexSet;
use scm_core::{
    EntityId, ForceSink, Frame, FrictionCallback, NodeId, SceneQuery, SoilParameters,
    SoilParametersCallback,
};
use scm_grid::{GridCoord, GridNode, HeightSource, NodeInfo, SpatialGrid};

use crate::bulldozing::bulldoze;
use crate::config::{Boundary, BulldozingConfig, ConfigError, ProbeConfig, TerrainConfig};
use crate::domain::ActiveDomainTracker;
use crate::forces::{BodyLoad, ForceLedger};
use crate::metrics::{StepMetrics, StepReport};
use crate::patch::assemble_patches;
use crate::raycast::{HitSet, RayCaster};
use crate::soil::{update_node, ContactInput};

/// Coefficient of friction reported when no [`FrictionCallback`] is
/// registered.
pub const DEFAULT_FRICTION_COEFFICIENT: f64 = 0.8;

// ── StepError ──────────────────────────────────────────────────────

/// Errors returned by [`SoilTerrain::step`]. No state is modified when
/// a step fails.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// The step size is NaN, infinite, zero, or negative.
    InvalidTimestep {
        /// The rejected value.
        dt: f64,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimestep { dt } => {
                write!(f, "timestep must be finite and positive, got {dt}")
            }
        }
    }
}

impl Error for StepError {}

// ── Builder ────────────────────────────────────────────────────────

/// Builder for [`SoilTerrain`].
///
/// Required: a height source and a scene query provider.
pub struct SoilTerrainBuilder<Q> {
    config: TerrainConfig,
    heights: Option<Box<dyn HeightSource>>,
    scene: Option<Q>,
    frame: Frame,
}

impl<Q: SceneQuery> SoilTerrainBuilder<Q> {
    /// Set the undeformed surface.
    pub fn heights(mut self, heights: impl HeightSource + 'static) -> Self {
        self.heights = Some(Box::new(heights));
        self
    }

    /// Set the scene query provider.
    pub fn scene(mut self, scene: Q) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Set the reference frame of the terrain plane (default: world).
    pub fn frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    /// Build the terrain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for a missing collaborator, an invalid
    /// grid spacing, or a degenerate boundary.
    pub fn build(self) -> Result<SoilTerrain<Q>, ConfigError> {
        self.config.validate()?;
        let scene = self.scene.ok_or(ConfigError::MissingSceneQuery)?;
        let heights = self.heights.ok_or(ConfigError::MissingHeightSource)?;
        let mut grid = SpatialGrid::new(heights)?;
        grid.set_frame(self.frame);

        let config = self.config;
        Ok(SoilTerrain {
            scene,
            grid,
            soil: config.soil,
            soil_callback: None,
            friction_callback: None,
            bulldozing: config.bulldozing.clamped(),
            caster: RayCaster::new(config.probe.clamped()),
            cosim: config.cosim_mode,
            boundary: config.boundary,
            domains: ActiveDomainTracker::new(),
            modified: IndexSet::new(),
            hit_nodes: Vec::new(),
            ledger: ForceLedger::new(),
            last_metrics: StepMetrics::default(),
        })
    }
}

// ── SoilTerrain ────────────────────────────────────────────────────

/// A deformable soil surface interacting with the entities of a scene.
pub struct SoilTerrain<Q> {
    scene: Q,
    grid: SpatialGrid,
    soil: SoilParameters,
    soil_callback: Option<Box<dyn SoilParametersCallback>>,
    friction_callback: Option<Box<dyn FrictionCallback>>,
    bulldozing: BulldozingConfig,
    caster: RayCaster,
    cosim: bool,
    boundary: Option<Boundary>,
    domains: ActiveDomainTracker,
    modified: IndexSet<GridCoord>,
    hit_nodes: Vec<GridCoord>,
    ledger: ForceLedger,
    last_metrics: StepMetrics,
}

impl<Q: SceneQuery> SoilTerrain<Q> {
    /// Start building a terrain from `config`.
    pub fn builder(config: TerrainConfig) -> SoilTerrainBuilder<Q> {
        SoilTerrainBuilder {
            config,
            heights: None,
            scene: None,
            frame: Frame::IDENTITY,
        }
    }

    // ── Stepping ───────────────────────────────────────────────────

    /// Advance the terrain by `dt`.
    ///
    /// Forces are handed to `sink` unless co-simulation mode is on, in
    /// which case they are only kept in the ledgers.
    pub fn step(&mut self, dt: f64, sink: &mut dyn ForceSink) -> Result<StepReport, StepError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(StepError::InvalidTimestep { dt });
        }
        let started = Instant::now();
        let mut metrics = StepMetrics::default();

        self.reset_transient();

        let t = Instant::now();
        self.domains
            .update(&self.scene, self.grid.frame(), self.grid.spacing());
        metrics.active_domains_us = micros(t.elapsed());

        let t = Instant::now();
        let mut hits = HitSet::new();
        let stats = self.caster.cast(
            &self.scene,
            &mut self.grid,
            self.domains.domains(),
            self.boundary.as_ref(),
            &mut hits,
        );
        metrics.ray_casts = stats.casts;
        metrics.ray_hits = hits.len();
        metrics.ray_testing_us = micros(stats.testing);
        metrics.ray_casting_us = micros(t.elapsed());

        let t = Instant::now();
        let patches = assemble_patches(&mut hits, self.grid.spacing());
        metrics.contact_patches = patches.len();
        metrics.contact_patches_us = micros(t.elapsed());

        let t = Instant::now();
        let frame = *self.grid.frame();
        let cell_area = self.grid.cell_area();
        let global_soil = self.soil.resolve();
        for (&c, hit) in &hits {
            let Some((level, normal)) = self.grid.node(c).map(|n| (n.level, n.normal)) else {
                continue;
            };
            let local_hit = frame.point_to_local(hit.point);
            let soil = match &self.soil_callback {
                Some(cb) => cb.parameters(local_hit).resolve(),
                None => global_soil,
            };
            let point = self.grid.world_point(c, level);
            let input = ContactInput {
                soil,
                hit_level: local_hit.z,
                oob: hit.patch.and_then(|p| patches.get(p)).map_or(0.0, |p| p.oob),
                velocity: self.scene.surface_velocity(hit.entity, point),
                normal: frame.dir_to_world(normal),
                dt,
                cell_area,
                entity_soil: self.scene.soil_override(hit.entity),
            };
            let Some(node) = self.grid.node_mut(c) else {
                continue;
            };
            let Some(force) = update_node(node, &input) else {
                continue;
            };
            self.modified.insert(c);
            self.ledger
                .accumulate(hit.entity, &hit.contact, point, force.total(), self.cosim, sink);
        }
        if !self.cosim {
            self.ledger.flush(sink);
        }
        metrics.contact_forces_us = micros(t.elapsed());

        if self.bulldozing.enabled {
            let t = Instant::now();
            bulldoze(
                &mut self.grid,
                &patches,
                &self.bulldozing,
                dt,
                &mut self.modified,
                &mut metrics,
            );
            metrics.bulldozing_us = micros(t.elapsed());
        }

        self.hit_nodes = hits.into_keys().collect();
        metrics.total_us = micros(started.elapsed());
        self.last_metrics = metrics.clone();
        Ok(StepReport { metrics })
    }

    fn reset_transient(&mut self) {
        for c in self.modified.drain(..).chain(self.hit_nodes.drain(..)) {
            if let Some(node) = self.grid.node_mut(c) {
                node.reset_transient();
            }
        }
        self.ledger.clear();
    }

    // ── Grid state ─────────────────────────────────────────────────

    /// Nodes and their current levels.
    ///
    /// With `all`, every stored node; otherwise only those modified
    /// during the last step.
    pub fn modified_nodes(&self, all: bool) -> Vec<(GridCoord, f64)> {
        if all {
            self.grid.iter().map(|(c, n)| (c, n.level)).collect()
        } else {
            self.modified
                .iter()
                .filter_map(|c| self.grid.node(*c).map(|n| (*c, n.level)))
                .collect()
        }
    }

    /// Overwrite the level of the given nodes, creating them as needed.
    ///
    /// The level also becomes the node's undeformed level; all soil
    /// state is reset.
    pub fn set_modified_nodes(&mut self, nodes: &[(GridCoord, f64)]) {
        for &(c, level) in nodes {
            let normal = self.grid.init_normal(c);
            self.grid.insert(c, GridNode::new(level, level, normal));
        }
    }

    /// Soil state at the node nearest to world point `loc`.
    pub fn node_info(&self, loc: DVec3) -> NodeInfo {
        self.grid.node_info(loc)
    }

    /// World height of the current surface below `loc`.
    pub fn height(&self, loc: DVec3) -> f64 {
        self.grid.world_height(loc)
    }

    /// World normal of the current surface below `loc`.
    pub fn normal(&self, loc: DVec3) -> DVec3 {
        self.grid.world_normal(loc)
    }

    /// Coefficient of friction of the surface below world point `loc`.
    ///
    /// Defers to the registered [`FrictionCallback`], otherwise returns
    /// [`DEFAULT_FRICTION_COEFFICIENT`].
    pub fn coefficient_friction(&self, loc: DVec3) -> f64 {
        self.friction_callback
            .as_ref()
            .map_or(DEFAULT_FRICTION_COEFFICIENT, |cb| cb.coefficient(loc))
    }

    /// World height of the undeformed surface below `loc`.
    pub fn init_height(&self, loc: DVec3) -> f64 {
        self.grid.world_init_height(loc)
    }

    /// World normal of the undeformed surface below `loc`.
    pub fn init_normal(&self, loc: DVec3) -> DVec3 {
        self.grid.world_init_normal(loc)
    }

    /// The grid store.
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    // ── Forces ─────────────────────────────────────────────────────

    /// Load accumulated on a rigid entity during the last step.
    pub fn body_force(&self, entity: EntityId) -> Option<BodyLoad> {
        self.ledger.body_force(entity)
    }

    /// Force accumulated on a flexible vertex during the last step.
    pub fn node_force(&self, node: NodeId) -> Option<DVec3> {
        self.ledger.node_force(node)
    }

    /// Force accumulated on a generic surface during the last step.
    pub fn surface_force(&self, entity: EntityId) -> Option<DVec3> {
        self.ledger.surface_force(entity)
    }

    /// All force ledgers of the last step.
    pub fn ledger(&self) -> &ForceLedger {
        &self.ledger
    }

    // ── Metrics ────────────────────────────────────────────────────

    /// Metrics of the last successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Probes issued during the last step.
    pub fn num_ray_casts(&self) -> usize {
        self.last_metrics.ray_casts
    }

    /// Nodes hit during the last step.
    pub fn num_ray_hits(&self) -> usize {
        self.last_metrics.ray_hits
    }

    /// Contact patches found during the last step.
    pub fn num_contact_patches(&self) -> usize {
        self.last_metrics.contact_patches
    }

    /// Erosion domain size of the last step.
    pub fn num_erosion_nodes(&self) -> usize {
        self.last_metrics.erosion_nodes
    }

    // ── Configuration ──────────────────────────────────────────────

    /// The scene query provider.
    pub fn scene(&self) -> &Q {
        &self.scene
    }

    /// Mutable access to the scene, e.g. to move entities between steps.
    pub fn scene_mut(&mut self) -> &mut Q {
        &mut self.scene
    }

    /// Replace the reference frame of the terrain plane.
    pub fn set_reference_frame(&mut self, frame: Frame) {
        self.grid.set_frame(frame);
    }

    /// Replace the global soil parameters.
    pub fn set_soil_parameters(&mut self, soil: SoilParameters) {
        self.soil = soil;
    }

    /// Use `callback` for location-dependent soil parameters instead of
    /// the global ones.
    pub fn register_soil_parameters_callback(
        &mut self,
        callback: impl SoilParametersCallback + 'static,
    ) {
        self.soil_callback = Some(Box::new(callback));
    }

    /// Use `callback` for [`coefficient_friction`](Self::coefficient_friction).
    pub fn register_friction_callback(&mut self, callback: impl FrictionCallback + 'static) {
        self.friction_callback = Some(Box::new(callback));
    }

    /// Replace the bulldozing settings (clamped).
    pub fn set_bulldozing(&mut self, config: BulldozingConfig) {
        self.bulldozing = config.clamped();
    }

    /// Replace the probe offsets (clamped to `>= 0`).
    pub fn set_probe_offsets(&mut self, offset_up: f64, offset_down: f64) {
        let probe = ProbeConfig {
            offset_up,
            offset_down,
            worker_count: self.caster.probe_config().worker_count,
        };
        self.caster = RayCaster::new(probe.clamped());
    }

    /// Turn co-simulation mode on or off.
    pub fn set_cosimulation_mode(&mut self, cosim: bool) {
        self.cosim = cosim;
    }

    /// Restrict probing to a rectangle of the reference plane.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBoundary`] for an inverted or
    /// non-finite rectangle; the previous boundary is kept.
    pub fn set_boundary(&mut self, min: DVec2, max: DVec2) -> Result<(), ConfigError> {
        self.boundary = Some(Boundary::new(min, max)?);
        Ok(())
    }

    /// Remove the probing boundary.
    pub fn clear_boundary(&mut self) {
        self.boundary = None;
    }

    /// The probing boundary, if any.
    pub fn boundary(&self) -> Option<&Boundary> {
        self.boundary.as_ref()
    }

    /// Probe only a box of size `dims` centered at `center` in the frame
    /// of `entity`. The first call replaces the default domain.
    pub fn add_active_domain(&mut self, entity: EntityId, center: DVec3, dims: DVec3) {
        self.domains.add(entity, center, dims);
    }

    /// The active domains as of the last step.
    pub fn active_domains(&self) -> &ActiveDomainTracker {
        &self.domains
    }
}

impl<Q> fmt::Debug for SoilTerrain<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoilTerrain")
            .field("grid", &self.grid)
            .field("soil", &self.soil)
            .field("bulldozing", &self.bulldozing)
            .field("cosim", &self.cosim)
            .field("boundary", &self.boundary)
            .field("domains", &self.domains.domains().len())
            .finish_non_exhaustive()
    }
}

fn micros(d: Duration) -> u64 {
    d.as_micros() as u64
}
