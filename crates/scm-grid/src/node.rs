//! Per-node deformation and soil state.

use glam::DVec3;

/// State of one lattice node.
///
/// Heights are measured along the reference frame Z axis; sinkages and
/// stresses along the node's undeformed local normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridNode {
    /// Undeformed level. Shifted by bulldozing when material is moved.
    pub level_initial: f64,
    /// Current (deformed) level.
    pub level: f64,
    /// Level of the most recent probe hit; `+inf` when not hit.
    pub hit_level: f64,
    /// Undeformed local surface normal (unit, reference frame).
    pub normal: DVec3,
    /// Total sinkage, `sinkage_elastic + sinkage_plastic`.
    pub sinkage: f64,
    /// Permanent part of the sinkage.
    pub sinkage_plastic: f64,
    /// Recoverable part of the sinkage.
    pub sinkage_elastic: f64,
    /// Current normal pressure.
    pub sigma: f64,
    /// Highest pressure ever reached (yield surface).
    pub sigma_yield: f64,
    /// Accumulated tangential displacement.
    pub kshear: f64,
    /// Current shear stress.
    pub tau: f64,
    /// Member of this step's erosion domain.
    pub erosion: bool,
    /// Displaced material not yet placed on the surface.
    pub massremainder: f64,
    /// Rate of plastic sinkage created this step.
    pub step_plastic_flow: f64,
}

impl GridNode {
    /// Create a node at `level` over an undeformed surface at `level_initial`.
    pub fn new(level_initial: f64, level: f64, normal: DVec3) -> Self {
        Self {
            level_initial,
            level,
            hit_level: f64::INFINITY,
            normal,
            sinkage: level_initial - level,
            sinkage_plastic: 0.0,
            sinkage_elastic: 0.0,
            sigma: 0.0,
            sigma_yield: 0.0,
            kshear: 0.0,
            tau: 0.0,
            erosion: false,
            massremainder: 0.0,
            step_plastic_flow: 0.0,
        }
    }

    /// An untouched node sitting on the undeformed surface.
    pub fn pristine(level: f64, normal: DVec3) -> Self {
        Self::new(level, level, normal)
    }

    /// Clear the fields that only describe the previous step.
    pub fn reset_transient(&mut self) {
        self.sigma = 0.0;
        self.sinkage_elastic = 0.0;
        self.step_plastic_flow = 0.0;
        self.erosion = false;
        self.hit_level = f64::INFINITY;
    }

    /// Public view of the soil state.
    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            sinkage: self.sinkage,
            sinkage_plastic: self.sinkage_plastic,
            sinkage_elastic: self.sinkage_elastic,
            sigma: self.sigma,
            sigma_yield: self.sigma_yield,
            kshear: self.kshear,
            tau: self.tau,
        }
    }
}

/// Soil state reported for a location; all zero for untouched nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeInfo {
    /// Total sinkage.
    pub sinkage: f64,
    /// Plastic sinkage.
    pub sinkage_plastic: f64,
    /// Elastic sinkage.
    pub sinkage_elastic: f64,
    /// Normal pressure.
    pub sigma: f64,
    /// Yield pressure.
    pub sigma_yield: f64,
    /// Accumulated shear displacement.
    pub kshear: f64,
    /// Shear stress.
    pub tau: f64,
}
