//! Contact patches: connected groups of hit nodes.
//!
//! The hit set is partitioned by breadth-first flood fill over the four
//! cardinal neighbours. Each patch then gets the convex hull of its
//! planar node positions, from which the Bekker shape factor
//! `oob = perimeter / (2 * area)` is derived.

use std::collections::VecDeque;

use glam::DVec2;
use scm_grid::GridCoord;

use crate::raycast::HitSet;

/// Hull area below which a patch is treated as degenerate (`oob = 0`).
pub const MIN_PATCH_AREA: f64 = 1e-6;

/// A maximal 4-connected group of hit nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactPatch {
    /// Member nodes, in discovery order.
    pub nodes: Vec<GridCoord>,
    /// Planar positions of the members in the reference plane.
    pub points: Vec<DVec2>,
    /// Convex hull area.
    pub area: f64,
    /// Convex hull perimeter.
    pub perimeter: f64,
    /// Shape factor, the inverse of a characteristic contact width.
    pub oob: f64,
}

impl ContactPatch {
    fn from_nodes(nodes: Vec<GridCoord>, delta: f64) -> Self {
        let points: Vec<DVec2> = nodes
            .iter()
            .map(|c| DVec2::new(f64::from(c.i) * delta, f64::from(c.j) * delta))
            .collect();
        let hull = convex_hull(&points);
        let (area, perimeter) = polygon_measures(&hull);
        let oob = if area < MIN_PATCH_AREA {
            0.0
        } else {
            perimeter / (2.0 * area)
        };
        Self {
            nodes,
            points,
            area,
            perimeter,
            oob,
        }
    }
}

/// Partition `hits` into patches and record each hit's patch index.
///
/// Patches are numbered in the order their first node appears in `hits`.
pub fn assemble_patches(hits: &mut HitSet, delta: f64) -> Vec<ContactPatch> {
    for record in hits.values_mut() {
        record.patch = None;
    }

    let mut patches = Vec::new();
    let mut queue = VecDeque::new();
    for seed in 0..hits.len() {
        if hits[seed].patch.is_some() {
            continue;
        }
        let id = patches.len();
        hits[seed].patch = Some(id);
        let mut members = Vec::new();
        queue.push_back(seed);
        while let Some(idx) = queue.pop_front() {
            let Some((&c, _)) = hits.get_index(idx) else {
                continue;
            };
            members.push(c);
            for nb in c.neighbours4() {
                if let Some((nb_idx, _, rec)) = hits.get_full_mut(&nb) {
                    if rec.patch.is_none() {
                        rec.patch = Some(id);
                        queue.push_back(nb_idx);
                    }
                }
            }
        }
        patches.push(ContactPatch::from_nodes(members, delta));
    }
    patches
}

fn cross(o: DVec2, a: DVec2, b: DVec2) -> f64 {
    (a - o).perp_dot(b - o)
}

/// Convex hull in counter-clockwise order, collinear points dropped.
pub fn convex_hull(points: &[DVec2]) -> Vec<DVec2> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<DVec2> = Vec::with_capacity(2 * pts.len());
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Area and perimeter of a closed polygon.
///
/// Two points give a segment with zero area and a perimeter of twice
/// its length.
fn polygon_measures(poly: &[DVec2]) -> (f64, f64) {
    if poly.len() < 2 {
        return (0.0, 0.0);
    }
    let mut twice_area = 0.0;
    let mut perimeter = 0.0;
    for (k, &a) in poly.iter().enumerate() {
        let b = poly[(k + 1) % poly.len()];
        twice_area += a.perp_dot(b);
        perimeter += a.distance(b);
    }
    (0.5 * twice_area.abs(), perimeter)
}
