//! Terrain configuration and setup-time validation.
//!
//! [`TerrainConfig`] bundles the soil, bulldozing and probing parameters.
//! Numeric parameters are clamped to their valid ranges rather than
//! rejected; only structural problems (missing collaborators, a bad grid
//! spacing, a degenerate boundary) produce a [`ConfigError`].

use std::error::Error;
use std::fmt;

use glam::DVec2;
use scm_core::SoilParameters;
use scm_grid::GridError;

/// Largest accepted erosion angle, in degrees.
pub const MAX_EROSION_ANGLE_DEG: f64 = 89.9;

// ── Boundary ───────────────────────────────────────────────────────

/// Rectangle in the reference plane outside which no probe is issued.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boundary {
    /// Lower corner.
    pub min: DVec2,
    /// Upper corner.
    pub max: DVec2,
}

impl Boundary {
    /// Create a boundary rectangle.
    ///
    /// Returns `Err(ConfigError::InvalidBoundary)` if a coordinate is not
    /// finite or the rectangle is inverted.
    pub fn new(min: DVec2, max: DVec2) -> Result<Self, ConfigError> {
        let b = Self { min, max };
        b.validate()?;
        Ok(b)
    }

    /// Check finiteness and ordering of the corners.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min.cmpgt(self.max).any() {
            return Err(ConfigError::InvalidBoundary {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// `true` if `p` lies inside the rectangle, edges included.
    pub fn contains(&self, p: DVec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

// ── BulldozingConfig ───────────────────────────────────────────────

/// Parameters of the lateral soil displacement process.
#[derive(Clone, Debug, PartialEq)]
pub struct BulldozingConfig {
    /// Run the bulldozing phases at all.
    pub enabled: bool,
    /// Angle of repose used as the slope limit, in degrees.
    pub erosion_angle_deg: f64,
    /// Multiplier on the displaced volume raised at patch boundaries.
    /// Values above 1 approximate soil expansion.
    pub flow_factor: f64,
    /// Number of relaxation sweeps per step.
    pub erosion_iterations: usize,
    /// Number of dilation rounds building the erosion domain.
    pub erosion_propagations: usize,
}

impl Default for BulldozingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            erosion_angle_deg: 40.0,
            flow_factor: 1.2,
            erosion_iterations: 3,
            erosion_propagations: 10,
        }
    }
}

impl BulldozingConfig {
    /// Copy with the angle clamped to `[0, 89.9]` degrees and the flow
    /// factor to `>= 0`. NaN values fall back to the defaults.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        let angle = if self.erosion_angle_deg.is_nan() {
            d.erosion_angle_deg
        } else {
            self.erosion_angle_deg.clamp(0.0, MAX_EROSION_ANGLE_DEG)
        };
        let flow = if self.flow_factor.is_nan() {
            d.flow_factor
        } else {
            self.flow_factor.max(0.0)
        };
        Self {
            enabled: self.enabled,
            erosion_angle_deg: angle,
            flow_factor: flow,
            erosion_iterations: self.erosion_iterations,
            erosion_propagations: self.erosion_propagations,
        }
    }
}

// ── ProbeConfig ────────────────────────────────────────────────────

/// Vertical probe geometry and the size of the probing worker pool.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeConfig {
    /// Distance above the current surface at which a probe ends.
    pub offset_up: f64,
    /// Length of the probe below its upper end.
    pub offset_down: f64,
    /// Number of probing threads. `None` = auto-detect.
    pub worker_count: Option<usize>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            offset_up: 0.1,
            offset_down: 0.5,
            worker_count: None,
        }
    }
}

impl ProbeConfig {
    /// Resolve the actual worker count.
    ///
    /// `None` uses the available parallelism clamped to `[1, 16]`;
    /// explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, 16),
        }
    }

    /// Copy with both offsets clamped to `>= 0` (NaN becomes 0).
    pub fn clamped(&self) -> Self {
        Self {
            offset_up: self.offset_up.max(0.0),
            offset_down: self.offset_down.max(0.0),
            worker_count: self.worker_count,
        }
    }
}

// ── TerrainConfig ──────────────────────────────────────────────────

/// Complete terrain configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainConfig {
    /// Global soil parameters, used where no callback is registered.
    pub soil: SoilParameters,
    /// Lateral displacement settings.
    pub bulldozing: BulldozingConfig,
    /// Probe geometry and parallelism.
    pub probe: ProbeConfig,
    /// When set, forces are left in the ledgers instead of being applied.
    pub cosim_mode: bool,
    /// Optional probing boundary in the reference plane.
    pub boundary: Option<Boundary>,
}

impl TerrainConfig {
    /// Check structural invariants. Numeric parameters are not checked
    /// here; they are clamped when the terrain is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(b) = &self.boundary {
            b.validate()?;
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building or reconfiguring a terrain.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// No scene-query provider was supplied.
    MissingSceneQuery,
    /// No initial height source was supplied.
    MissingHeightSource,
    /// The grid spacing is NaN, infinite, zero, or negative.
    InvalidSpacing {
        /// The invalid value.
        value: f64,
    },
    /// The boundary rectangle is inverted or not finite.
    InvalidBoundary {
        /// Lower corner as given.
        min: DVec2,
        /// Upper corner as given.
        max: DVec2,
    },
    /// The height source could not be used.
    Grid(GridError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSceneQuery => write!(f, "no scene query provider supplied"),
            Self::MissingHeightSource => write!(f, "no height source supplied"),
            Self::InvalidSpacing { value } => {
                write!(f, "grid spacing must be finite and positive, got {value}")
            }
            Self::InvalidBoundary { min, max } => {
                write!(f, "invalid boundary: min {min} max {max}")
            }
            Self::Grid(e) => write!(f, "grid: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for ConfigError {
    fn from(e: GridError) -> Self {
        match e {
            GridError::InvalidSpacing { value } => Self::InvalidSpacing { value },
            other => Self::Grid(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TerrainConfig::default();
        assert!(!cfg.bulldozing.enabled);
        assert_eq!(cfg.bulldozing.erosion_angle_deg, 40.0);
        assert_eq!(cfg.bulldozing.flow_factor, 1.2);
        assert_eq!(cfg.bulldozing.erosion_iterations, 3);
        assert_eq!(cfg.bulldozing.erosion_propagations, 10);
        assert_eq!(cfg.probe.offset_up, 0.1);
        assert_eq!(cfg.probe.offset_down, 0.5);
        assert!(!cfg.cosim_mode);
        assert!(cfg.boundary.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bulldozing_clamps_angle_and_flow() {
        let b = BulldozingConfig {
            erosion_angle_deg: 120.0,
            flow_factor: -3.0,
            ..BulldozingConfig::default()
        }
        .clamped();
        assert_eq!(b.erosion_angle_deg, MAX_EROSION_ANGLE_DEG);
        assert_eq!(b.flow_factor, 0.0);
    }

    #[test]
    fn bulldozing_nan_falls_back_to_default() {
        let b = BulldozingConfig {
            erosion_angle_deg: f64::NAN,
            ..BulldozingConfig::default()
        }
        .clamped();
        assert_eq!(b.erosion_angle_deg, 40.0);
    }

    #[test]
    fn probe_offsets_clamped() {
        let p = ProbeConfig {
            offset_up: -1.0,
            offset_down: f64::NAN,
            worker_count: None,
        }
        .clamped();
        assert_eq!(p.offset_up, 0.0);
        assert_eq!(p.offset_down, 0.0);
    }

    #[test]
    fn resolved_worker_count_clamps_zero() {
        let p = ProbeConfig {
            worker_count: Some(0),
            ..ProbeConfig::default()
        };
        assert_eq!(p.resolved_worker_count(), 1);
    }

    #[test]
    fn resolved_worker_count_clamps_large() {
        let p = ProbeConfig {
            worker_count: Some(500),
            ..ProbeConfig::default()
        };
        assert_eq!(p.resolved_worker_count(), 64);
    }

    #[test]
    fn resolved_worker_count_auto() {
        let count = ProbeConfig::default().resolved_worker_count();
        assert!((1..=16).contains(&count), "auto count {count} out of range");
    }

    #[test]
    fn boundary_rejects_inverted() {
        let r = Boundary::new(DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0));
        assert!(matches!(r, Err(ConfigError::InvalidBoundary { .. })));
        let r = Boundary::new(DVec2::ZERO, DVec2::new(f64::INFINITY, 1.0));
        assert!(matches!(r, Err(ConfigError::InvalidBoundary { .. })));
    }

    #[test]
    fn boundary_contains_edges() {
        let b = Boundary::new(DVec2::splat(-1.0), DVec2::splat(1.0)).unwrap();
        assert!(b.contains(DVec2::new(1.0, -1.0)));
        assert!(!b.contains(DVec2::new(1.01, 0.0)));
    }

    #[test]
    fn validate_catches_bad_boundary_in_config() {
        let cfg = TerrainConfig {
            boundary: Some(Boundary {
                min: DVec2::splat(2.0),
                max: DVec2::splat(1.0),
            }),
            ..TerrainConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidBoundary { .. })
        ));
    }

    #[test]
    fn grid_spacing_error_converts() {
        let e: ConfigError = GridError::InvalidSpacing { value: -1.0 }.into();
        assert_eq!(e, ConfigError::InvalidSpacing { value: -1.0 });
        let e: ConfigError = GridError::NonFiniteSample { index: 3 }.into();
        assert!(e.source().is_some());
    }
}
