//! Integration test: lateral displacement around a rut.
//!
//! With bulldozing off only hit nodes are ever stored. With it on, the
//! ring around the contact patch is raised and an erosion domain grows
//! around it.

use glam::DVec3;
use scm_core::{EntityId, NullForceSink};
use scm_engine::{BulldozingConfig, SoilTerrain, TerrainConfig};
use scm_grid::FlatPatch;
use scm_test_utils::fixtures::resting_sphere;
use scm_test_utils::MockScene;

const BODY: EntityId = EntityId(1);

fn terrain(scene: MockScene, bulldozing: BulldozingConfig) -> SoilTerrain<MockScene> {
    let config = TerrainConfig {
        bulldozing,
        ..TerrainConfig::default()
    };
    SoilTerrain::builder(config)
        .heights(FlatPatch::new(4.0, 4.0, 0.125).unwrap())
        .scene(scene)
        .build()
        .unwrap()
}

fn enabled() -> BulldozingConfig {
    BulldozingConfig {
        enabled: true,
        ..BulldozingConfig::default()
    }
}

fn max_level(t: &SoilTerrain<MockScene>) -> f64 {
    t.modified_nodes(true)
        .into_iter()
        .map(|(_, level)| level)
        .fold(f64::NEG_INFINITY, f64::max)
}

#[test]
fn disabled_bulldozing_stores_only_hit_nodes() {
    let mut t = terrain(resting_sphere(BODY, 0.5, 0.02), BulldozingConfig::default());
    let report = t.step(1e-3, &mut NullForceSink).unwrap();
    assert_eq!(t.num_erosion_nodes(), 0);
    assert_eq!(report.metrics.bulldozing_us, 0);
    assert_eq!(t.grid().len(), t.num_ray_hits());
    assert!(max_level(&t) <= 0.0);
}

#[test]
fn enabled_bulldozing_raises_rim() {
    let mut t = terrain(resting_sphere(BODY, 0.5, 0.02), enabled());
    t.step(1e-3, &mut NullForceSink).unwrap();

    assert!(t.num_erosion_nodes() > 0);
    assert!(t.grid().len() > t.num_ray_hits());
    assert!(max_level(&t) > 0.0);
    // The rut itself stays below the plane.
    assert!(t.height(DVec3::new(0.0, 0.0, 1.0)) < 0.0);
}

#[test]
fn erosion_domain_bounded_by_propagation_rounds() {
    let config = BulldozingConfig {
        erosion_propagations: 2,
        ..enabled()
    };
    let mut t = terrain(resting_sphere(BODY, 0.5, 0.02), config);
    t.step(1e-3, &mut NullForceSink).unwrap();
    let few = t.num_erosion_nodes();

    let mut t = terrain(resting_sphere(BODY, 0.5, 0.02), enabled());
    t.step(1e-3, &mut NullForceSink).unwrap();
    assert!(t.num_erosion_nodes() > few);
}

#[test]
fn zero_flow_factor_piles_nothing() {
    let config = BulldozingConfig {
        flow_factor: 0.0,
        ..enabled()
    };
    let mut t = terrain(resting_sphere(BODY, 0.5, 0.02), config);
    t.step(1e-3, &mut NullForceSink).unwrap();
    assert!(t.num_erosion_nodes() > 0);
    assert!(max_level(&t) <= 0.0);
}

#[test]
fn erosion_flags_are_cleared_next_step() {
    let mut t = terrain(resting_sphere(BODY, 0.5, 0.02), enabled());
    t.step(1e-3, &mut NullForceSink).unwrap();
    assert!(t.grid().iter().any(|(_, n)| n.erosion));

    t.scene_mut().remove(BODY);
    t.step(1e-3, &mut NullForceSink).unwrap();
    assert!(t.grid().iter().all(|(_, n)| !n.erosion));
    assert_eq!(t.num_erosion_nodes(), 0);
}
