//! Reusable soil and scene fixtures.
//!
//! - [`CountingSoilCallback`]: constant parameters, counts its calls.
//! - [`soft_soil`]: linear soil with round numbers.
//! - [`resting_sphere`] / [`plate_scene`]: one-body scenes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::DVec3;
use scm_core::{EntityId, SoilParameters, SoilParametersCallback};

use crate::MockScene;

/// Returns fixed parameters and counts how often it was asked.
///
/// The counter is shared, so a clone kept by the test observes calls
/// made through the copy handed to the terrain.
#[derive(Clone, Debug)]
pub struct CountingSoilCallback {
    pub params: SoilParameters,
    calls: Arc<AtomicUsize>,
}

impl CountingSoilCallback {
    pub fn new(params: SoilParameters) -> Self {
        Self {
            params,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl SoilParametersCallback for CountingSoilCallback {
    fn parameters(&self, _local_point: DVec3) -> SoilParameters {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.params
    }
}

/// Linear Bekker soil with no cohesion, friction or damping.
///
/// `Kphi = 1e6`, `n = 1`, `K = 1e7`. Handy for closed-form pressure checks.
pub fn soft_soil() -> SoilParameters {
    SoilParameters {
        bekker_kphi: 1e6,
        bekker_kc: 0.0,
        bekker_n: 1.0,
        mohr_cohesion: 0.0,
        mohr_friction_deg: 0.0,
        janosi_shear: 0.01,
        elastic_k: 1e7,
        damping_r: 0.0,
    }
}

/// A sphere of `radius` whose lowest point sits `penetration` below z = 0.
pub fn resting_sphere(id: EntityId, radius: f64, penetration: f64) -> MockScene {
    let mut scene = MockScene::new();
    scene.add_sphere(id, DVec3::new(0.0, 0.0, radius - penetration), radius);
    scene
}

/// A flat square plate of side `side` whose underside sits at `bottom`.
pub fn plate_scene(id: EntityId, side: f64, bottom: f64) -> MockScene {
    let mut scene = MockScene::new();
    let half = DVec3::new(side / 2.0, side / 2.0, 0.05);
    scene.add_box(id, DVec3::new(0.0, 0.0, bottom + half.z), half);
    scene
}
