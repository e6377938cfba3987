//! Benchmark profiles and utilities for the SCM soil model.
//!
//! Provides pre-built terrains for benchmarking:
//!
//! - [`reference_profile`]: 8 m × 8 m rough ground at 5 cm, four wheels
//! - [`stress_profile`]: same ground at 2 cm with bulldozing enabled
//! - [`rough_heightfield`]: deterministic random relief via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use glam::DVec3;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use scm_core::EntityId;
use scm_engine::{BulldozingConfig, SoilTerrain, TerrainConfig};
use scm_grid::{GridError, Heightfield};
use scm_test_utils::MockScene;

/// Wheel radius used by the profiles.
pub const WHEEL_RADIUS: f64 = 0.4;

/// Build a reference benchmark profile: 161×161 samples (~26K nodes).
///
/// Four wheels sunk 3 cm into rough ground, rolling along X at 1 m/s.
pub fn reference_profile(seed: u64) -> SoilTerrain<MockScene> {
    build(seed, 0.05, BulldozingConfig::default())
}

/// Build a stress benchmark profile: 401×401 samples (~160K nodes).
///
/// Same scene as [`reference_profile`] at a finer spacing, with
/// bulldozing enabled.
pub fn stress_profile(seed: u64) -> SoilTerrain<MockScene> {
    let bulldozing = BulldozingConfig {
        enabled: true,
        ..BulldozingConfig::default()
    };
    build(seed, 0.02, bulldozing)
}

fn build(seed: u64, delta: f64, bulldozing: BulldozingConfig) -> SoilTerrain<MockScene> {
    let half = (4.0 / delta).round() as u32;
    let ground = rough_heightfield(half, delta, 0.01, seed).unwrap();
    let config = TerrainConfig {
        bulldozing,
        ..TerrainConfig::default()
    };
    SoilTerrain::builder(config)
        .heights(ground)
        .scene(wheel_scene(0.03))
        .build()
        .unwrap()
}

/// Four rigid wheels at the corners of a 2 m × 1.5 m rectangle.
pub fn wheel_scene(sinkage: f64) -> MockScene {
    let mut scene = MockScene::new();
    let z = WHEEL_RADIUS - sinkage;
    let corners = [(-1.0, -0.75), (1.0, -0.75), (-1.0, 0.75), (1.0, 0.75)];
    for (k, (x, y)) in corners.into_iter().enumerate() {
        scene
            .add_sphere(EntityId(k as u64 + 1), DVec3::new(x, y, z), WHEEL_RADIUS)
            .with_velocity(DVec3::new(1.0, 0.0, 0.0));
    }
    scene
}

/// Generate a deterministic random height field.
///
/// Uniform noise of the given `amplitude` is smoothed once by averaging
/// each sample with its four neighbours, so slopes stay moderate.
pub fn rough_heightfield(
    half: u32,
    delta: f64,
    amplitude: f64,
    seed: u64,
) -> Result<Heightfield, GridError> {
    let n = 2 * half as usize + 1;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise: Vec<f64> = (0..n * n)
        .map(|_| rng.random_range(-amplitude..=amplitude))
        .collect();
    let at = |i: usize, j: usize| noise[j.min(n - 1) * n + i.min(n - 1)];
    let mut smoothed = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            let sum = at(i, j)
                + at(i.saturating_sub(1), j)
                + at(i + 1, j)
                + at(i, j.saturating_sub(1))
                + at(i, j + 1);
            smoothed.push(sum / 5.0);
        }
    }
    Heightfield::new(half, half, delta, smoothed)
}
