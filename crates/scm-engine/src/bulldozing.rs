//! Lateral soil displacement ("bulldozing").
//!
//! Material pushed down under a contact patch is piled onto the ring of
//! untouched nodes around it, then spread by a few sweeps of local
//! relaxation over a dilated neighbourhood of those rings:
//!
//! 1. **Boundary raise**: the plastic volume created under each patch,
//!    scaled by the flow factor, is shared evenly among its boundary.
//! 2. **Domain dilation**: the boundaries grow outward a fixed number of
//!    rounds over untouched nodes, forming the erosion domain.
//! 3. **Relaxation**: each domain node evens out its banked remainder
//!    with its neighbours and sheds material down slopes steeper than
//!    the angle of repose.

use std::time::Instant;

use indexmap::IndexSet;
use scm_grid::{GridCoord, GridNode, SpatialGrid};

use crate::config::BulldozingConfig;
use crate::metrics::StepMetrics;
use crate::patch::ContactPatch;

/// Fraction of a pairwise difference moved per exchange.
const EXCHANGE_FRACTION: f64 = 0.5;
/// Share of an exchange given to one of the four neighbours.
const NEIGHBOUR_SHARE: f64 = 1.0 / 4.0;

/// Raise `node` by `amount`, banking what does not fit below the
/// contacting surface in `massremainder`.
///
/// The undeformed level moves with the current one so the sinkage
/// reference is preserved.
pub fn add_material(node: &mut GridNode, amount: f64) {
    let room = (node.hit_level - node.level).max(0.0);
    let placed = if amount > room {
        node.massremainder += amount - room;
        room
    } else {
        amount
    };
    node.level += placed;
    node.level_initial += placed;
}

/// Take `amount` from `node`: first from its banked remainder, then
/// from its level.
pub fn remove_material(node: &mut GridNode, amount: f64) {
    let banked = node.massremainder.max(0.0).min(amount);
    node.massremainder -= banked;
    let rest = amount - banked;
    node.level -= rest;
    node.level_initial -= rest;
}

/// Run all three phases over this step's `patches`.
///
/// Every node whose level may change is added to `modified`. Phase
/// timings and the erosion domain size are written into `metrics`.
pub fn bulldoze(
    grid: &mut SpatialGrid,
    patches: &[ContactPatch],
    config: &BulldozingConfig,
    dt: f64,
    modified: &mut IndexSet<GridCoord>,
    metrics: &mut StepMetrics,
) {
    let t = Instant::now();
    let boundary = raise_boundaries(grid, patches, config.flow_factor, dt, modified);
    metrics.bulldozing_boundary_us = t.elapsed().as_micros() as u64;

    let t = Instant::now();
    let domain = dilate(grid, boundary, config.erosion_propagations, modified);
    metrics.erosion_nodes = domain.len();
    metrics.bulldozing_domain_us = t.elapsed().as_micros() as u64;

    let t = Instant::now();
    let dy_lim = grid.spacing() * config.erosion_angle_deg.to_radians().tan();
    relax(grid, &domain, config.erosion_iterations, dy_lim, modified);
    metrics.bulldozing_erosion_us = t.elapsed().as_micros() as u64;
}

fn touched(grid: &SpatialGrid, c: GridCoord) -> bool {
    grid.node(c).is_some_and(|n| n.sigma > 0.0)
}

/// Phase 1. Returns the union of all patch boundaries.
fn raise_boundaries(
    grid: &mut SpatialGrid,
    patches: &[ContactPatch],
    flow_factor: f64,
    dt: f64,
    modified: &mut IndexSet<GridCoord>,
) -> IndexSet<GridCoord> {
    let mut all = IndexSet::new();
    for patch in patches {
        let mut ring = IndexSet::new();
        let mut flow = 0.0;
        for &c in &patch.nodes {
            let Some(node) = grid.node(c) else {
                continue;
            };
            if node.sigma <= 0.0 {
                continue;
            }
            flow += node.step_plastic_flow;
            for nb in c.neighbours4() {
                if !touched(grid, nb) {
                    ring.insert(nb);
                }
            }
        }
        if ring.is_empty() {
            continue;
        }

        let raise = flow_factor * flow * dt / ring.len() as f64;
        for &c in &ring {
            modified.insert(c);
            let (node, _) = grid.get_or_insert_pristine(c);
            node.erosion = true;
            add_material(node, raise);
        }
        all.extend(ring);
    }
    all
}

/// Phase 2. Grows `boundary` outward over untouched nodes.
fn dilate(
    grid: &mut SpatialGrid,
    boundary: IndexSet<GridCoord>,
    rounds: usize,
    modified: &mut IndexSet<GridCoord>,
) -> IndexSet<GridCoord> {
    let mut domain = boundary.clone();
    let mut front = boundary;
    for _ in 0..rounds {
        let mut next = IndexSet::new();
        for &c in &front {
            for nb in c.neighbours4() {
                let (node, created) = grid.get_or_insert_pristine(nb);
                if created || (!node.erosion && node.sigma <= 0.0) {
                    node.erosion = true;
                    next.insert(nb);
                    modified.insert(nb);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        domain.extend(next.iter().copied());
        front = next;
    }
    domain
}

/// Phase 3. Neighbours outside the domain that gain or lose material
/// are added to `modified` as well.
fn relax(
    grid: &mut SpatialGrid,
    domain: &IndexSet<GridCoord>,
    iterations: usize,
    dy_lim: f64,
    modified: &mut IndexSet<GridCoord>,
) {
    for _ in 0..iterations {
        for &c in domain {
            for nb in grid.stored_neighbours(c) {
                let Some(mut other) = grid.node(nb).copied() else {
                    continue;
                };
                let Some(node) = grid.node_mut(c) else {
                    continue;
                };
                if !exchange(node, &mut other, dy_lim) {
                    continue;
                }
                if let Some(slot) = grid.node_mut(nb) {
                    *slot = other;
                }
                modified.insert(c);
                modified.insert(nb);
            }
        }
    }
}

/// One relaxation exchange between a domain node and a neighbour.
/// Returns `true` if any material moved.
fn exchange(node: &mut GridNode, other: &mut GridNode, dy_lim: f64) -> bool {
    let mut moved = false;
    let diff = EXCHANGE_FRACTION * (node.massremainder - other.massremainder) * NEIGHBOUR_SHARE;
    if diff > 0.0 {
        remove_material(node, diff);
        add_material(other, diff);
        moved = true;
    }

    if other.sigma == 0.0 {
        let dy = (node.level + node.massremainder) - (other.level + other.massremainder);
        let diff = EXCHANGE_FRACTION * (dy.abs() - dy_lim) * NEIGHBOUR_SHARE;
        if diff > 0.0 {
            if dy > 0.0 {
                remove_material(node, diff);
                add_material(other, diff);
            } else {
                remove_material(other, diff);
                add_material(node, diff);
            }
            moved = true;
        }
    }
    moved
}
