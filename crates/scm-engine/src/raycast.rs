//! Vertical probing of active domains.
//!
//! Every covered lattice node gets one probe along the reference plane
//! normal, from below the current surface up to just above it. Probes
//! are distributed over a pool of scoped worker threads through a
//! crossbeam job channel. Each worker keeps its own list of hits; the
//! lists are merged into the shared hit set on the calling thread, in
//! probe order, which is also the only place the grid store grows.

use std::ops::Range;
use std::thread;
use std::time::{Duration, Instant};

use glam::DVec3;
use indexmap::IndexMap;
use scm_core::{ContactKind, EntityId, SceneQuery};
use scm_grid::{GridCoord, SpatialGrid};

use crate::config::{Boundary, ProbeConfig};
use crate::domain::{ActiveDomain, BoxTest};

/// Number of probes handed to a worker at a time.
const PROBE_CHUNK: usize = 256;

/// A probe that hit something.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRecord {
    /// The entity that was hit.
    pub entity: EntityId,
    /// World-space hit point.
    pub point: DVec3,
    /// How forces on the entity are applied.
    pub contact: ContactKind,
    /// Contact patch index; `None` until patches are assembled.
    pub patch: Option<usize>,
}

/// Hits of the current step, keyed by lattice node, in probe order.
pub type HitSet = IndexMap<GridCoord, HitRecord>;

/// Work done while probing the active domains of a step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CastStats {
    /// Probes actually issued.
    pub casts: usize,
    /// Time spent probing, merge excluded.
    pub testing: Duration,
}

/// Issues the probes of a step.
#[derive(Clone, Debug)]
pub struct RayCaster {
    probe: ProbeConfig,
    workers: usize,
}

struct ProbeContext<'a, Q: ?Sized> {
    scene: &'a Q,
    grid: &'a SpatialGrid,
    coords: Vec<GridCoord>,
    up: DVec3,
    offset_up: f64,
    offset_down: f64,
    boundary: Option<&'a Boundary>,
    box_test: Option<&'a BoxTest>,
}

/// A slice of one domain's probes.
type ProbeJob = (usize, Range<usize>);

/// Hits found by one worker, tagged with their domain and probe index.
#[derive(Default)]
struct LocalHits {
    hits: Vec<(usize, usize, HitRecord)>,
    casts: usize,
}

impl<Q: SceneQuery + ?Sized> ProbeContext<'_, Q> {
    fn run(&self, domain: usize, range: Range<usize>, out: &mut LocalHits) {
        for k in range {
            let c = self.coords[k];
            if let Some(b) = self.boundary {
                if !b.contains(self.grid.planar_position(c)) {
                    continue;
                }
            }
            let vertex = self.grid.world_point(c, self.grid.height(c));
            let to = vertex + self.up * self.offset_up;
            let from = to - self.up * self.offset_down;
            if let Some(bt) = self.box_test {
                if !bt.may_hit(from) {
                    continue;
                }
            }
            out.casts += 1;
            if let Some(hit) = self.scene.probe(from, to) {
                out.hits.push((
                    domain,
                    k,
                    HitRecord {
                        entity: hit.entity,
                        point: hit.point,
                        contact: hit.contact,
                        patch: None,
                    },
                ));
            }
        }
    }
}

fn drain<Q: SceneQuery + ?Sized>(
    contexts: &[ProbeContext<'_, Q>],
    jobs: &crossbeam_channel::Receiver<ProbeJob>,
) -> LocalHits {
    let mut out = LocalHits::default();
    while let Ok((d, range)) = jobs.recv() {
        contexts[d].run(d, range, &mut out);
    }
    out
}

impl RayCaster {
    /// Create a caster using the (already clamped) probe configuration.
    pub fn new(probe: ProbeConfig) -> Self {
        let workers = probe.resolved_worker_count();
        Self { probe, workers }
    }

    /// Probe geometry in use.
    pub fn probe_config(&self) -> &ProbeConfig {
        &self.probe
    }

    /// Number of probing threads, the calling thread included.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Probe every node of every domain and merge the hits into `hits`.
    ///
    /// All domains share one batch of worker threads. Hits are merged
    /// domain by domain in probe order; a node already present in `hits`
    /// keeps its first record. A store node is created for every newly
    /// hit coordinate.
    pub fn cast<Q: SceneQuery + ?Sized>(
        &self,
        scene: &Q,
        grid: &mut SpatialGrid,
        domains: &[ActiveDomain],
        boundary: Option<&Boundary>,
        hits: &mut HitSet,
    ) -> CastStats {
        let started = Instant::now();
        let (mut found, casts, probed) = {
            let view = &*grid;
            let contexts: Vec<ProbeContext<'_, Q>> = domains
                .iter()
                .map(|domain| ProbeContext {
                    scene,
                    grid: view,
                    coords: domain.range().iter().collect(),
                    up: view.frame().axis_z(),
                    offset_up: self.probe.offset_up,
                    offset_down: self.probe.offset_down,
                    boundary,
                    box_test: domain.box_test(),
                })
                .collect();
            let locals = self.dispatch(&contexts);

            let mut casts = 0;
            let mut found: Vec<(usize, usize, HitRecord)> = Vec::new();
            for local in locals {
                casts += local.casts;
                found.extend(local.hits);
            }
            let probed: Vec<Vec<GridCoord>> = contexts.into_iter().map(|ctx| ctx.coords).collect();
            (found, casts, probed)
        };
        let testing = started.elapsed();
        if casts == 0 {
            return CastStats::default();
        }

        found.sort_unstable_by_key(|(d, k, _)| (*d, *k));
        for (d, k, record) in found {
            let c = probed[d][k];
            if hits.contains_key(&c) {
                continue;
            }
            grid.get_or_insert_pristine(c);
            hits.insert(c, record);
        }

        CastStats { casts, testing }
    }

    fn dispatch<Q: SceneQuery + ?Sized>(
        &self,
        contexts: &[ProbeContext<'_, Q>],
    ) -> Vec<LocalHits> {
        let chunks: usize = contexts
            .iter()
            .map(|ctx| ctx.coords.len().div_ceil(PROBE_CHUNK))
            .sum();
        let helpers = self.workers.min(chunks).saturating_sub(1);
        if helpers == 0 {
            let mut out = LocalHits::default();
            for (d, ctx) in contexts.iter().enumerate() {
                ctx.run(d, 0..ctx.coords.len(), &mut out);
            }
            return vec![out];
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        for (d, ctx) in contexts.iter().enumerate() {
            let n = ctx.coords.len();
            for start in (0..n).step_by(PROBE_CHUNK) {
                job_tx.send((d, start..(start + PROBE_CHUNK).min(n))).ok();
            }
        }
        drop(job_tx);

        thread::scope(|s| {
            let mut handles = Vec::with_capacity(helpers);
            for i in 0..helpers {
                let rx = job_rx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("scm-probe-{i}"))
                    .spawn_scoped(s, move || drain(contexts, &rx));
                // A failed spawn leaves its share of jobs to the others.
                if let Ok(h) = spawned {
                    handles.push(h);
                }
            }
            let mut locals = vec![drain(contexts, &job_rx)];
            for h in handles {
                match h.join() {
                    Ok(local) => locals.push(local),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            locals
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActiveDomainTracker;
    use glam::DVec2;
    use scm_core::Frame;
    use scm_grid::FlatPatch;
    use scm_test_utils::MockScene;

    fn grid() -> SpatialGrid {
        SpatialGrid::new(Box::new(FlatPatch::new(10.0, 10.0, 0.1).unwrap())).unwrap()
    }

    fn caster(workers: usize) -> RayCaster {
        RayCaster::new(ProbeConfig {
            worker_count: Some(workers),
            ..ProbeConfig::default()
        })
    }

    fn tracker_for(scene: &MockScene) -> ActiveDomainTracker {
        let mut t = ActiveDomainTracker::new();
        t.update(scene, &Frame::IDENTITY, 0.1);
        t
    }

    #[test]
    fn sphere_in_soil_produces_hits_and_nodes() {
        let mut scene = MockScene::new();
        scene.add_sphere(EntityId(1), DVec3::new(0.0, 0.0, 0.18), 0.2);
        let t = tracker_for(&scene);
        let mut g = grid();
        let mut hits = HitSet::new();
        let stats = caster(1).cast(&scene, &mut g, t.domains(), None, &mut hits);
        assert_eq!(stats.casts, 25);
        assert!(hits.contains_key(&GridCoord::new(0, 0)));
        assert_eq!(g.len(), hits.len());
        let h = hits[&GridCoord::new(0, 0)];
        assert_eq!(h.entity, EntityId(1));
        assert!((h.point.z - (-0.02)).abs() < 1e-9);
        assert!(h.patch.is_none());
    }

    #[test]
    fn parallel_and_serial_casts_agree() {
        let mut scene = MockScene::new();
        scene.add_box(EntityId(3), DVec3::new(0.0, 0.0, 0.0), DVec3::new(2.0, 2.0, 0.05));
        let t = tracker_for(&scene);

        let mut g1 = grid();
        let mut h1 = HitSet::new();
        let s1 = caster(1).cast(&scene, &mut g1, t.domains(), None, &mut h1);

        let mut g4 = grid();
        let mut h4 = HitSet::new();
        let s4 = caster(4).cast(&scene, &mut g4, t.domains(), None, &mut h4);

        assert_eq!(s1.casts, s4.casts);
        assert!(s1.casts > PROBE_CHUNK);
        let k1: Vec<_> = h1.keys().copied().collect();
        let k4: Vec<_> = h4.keys().copied().collect();
        assert_eq!(k1, k4);
        assert_eq!(g1.len(), g4.len());
    }

    #[test]
    fn boundary_skips_outside_probes() {
        let mut scene = MockScene::new();
        scene.add_sphere(EntityId(1), DVec3::new(0.0, 0.0, 0.18), 0.2);
        let t = tracker_for(&scene);
        let mut g = grid();
        let mut hits = HitSet::new();
        let b = Boundary::new(DVec2::new(0.05, -1.0), DVec2::new(1.0, 1.0)).unwrap();
        let stats = caster(1).cast(&scene, &mut g, t.domains(), Some(&b), &mut hits);
        assert_eq!(stats.casts, 10);
        assert!(hits.keys().all(|c| c.i >= 1));
    }

    #[test]
    fn first_domain_wins_on_overlap() {
        let mut scene = MockScene::new();
        scene.add_sphere(EntityId(1), DVec3::new(0.0, 0.0, 0.18), 0.2);
        let t = tracker_for(&scene);
        let mut g = grid();
        let mut hits = HitSet::new();
        let c = caster(1);
        c.cast(&scene, &mut g, t.domains(), None, &mut hits);
        let before = hits.clone();
        c.cast(&scene, &mut g, t.domains(), None, &mut hits);
        assert_eq!(before, hits);
    }

    #[test]
    fn domains_share_one_batch_and_first_wins() {
        let mut scene = MockScene::new();
        scene.add_box(EntityId(1), DVec3::ZERO, DVec3::new(2.0, 2.0, 0.05));
        let mut t = ActiveDomainTracker::new();
        t.add(EntityId(1), DVec3::ZERO, DVec3::new(3.05, 3.05, 1.0));
        t.add(EntityId(1), DVec3::ZERO, DVec3::new(2.05, 2.05, 1.0));
        t.update(&scene, &Frame::IDENTITY, 0.1);
        let expected: usize = t.domains().iter().map(|d| d.range().len()).sum();

        let mut g1 = grid();
        let mut h1 = HitSet::new();
        let s1 = caster(1).cast(&scene, &mut g1, t.domains(), None, &mut h1);

        let mut g4 = grid();
        let mut h4 = HitSet::new();
        let s4 = caster(4).cast(&scene, &mut g4, t.domains(), None, &mut h4);

        assert!(expected > PROBE_CHUNK);
        assert_eq!(s1.casts, expected);
        assert_eq!(s4.casts, expected);
        // The inner domain only repeats nodes of the outer one.
        assert_eq!(h1.len(), t.domains()[0].range().len());
        let k1: Vec<_> = h1.keys().copied().collect();
        let k4: Vec<_> = h4.keys().copied().collect();
        assert_eq!(k1, k4);
        assert_eq!(g4.len(), h4.len());
    }

    #[test]
    fn empty_scene_casts_nothing() {
        let scene = MockScene::new();
        let t = tracker_for(&scene);
        let mut g = grid();
        let mut hits = HitSet::new();
        let stats = caster(2).cast(&scene, &mut g, t.domains(), None, &mut hits);
        assert_eq!(stats, CastStats::default());
        assert!(g.is_empty());
    }
}
