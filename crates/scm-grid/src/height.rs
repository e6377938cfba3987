//! Undeformed surface descriptions.
//!
//! A [`HeightSource`] answers "how high was the soil at this lattice node
//! before anything touched it". It is consulted when a node is first
//! stored and whenever an untouched node is queried; it is never mutated.

use glam::DVec3;

use crate::coord::GridCoord;
use crate::error::GridError;

/// Undeformed height field over the integer lattice.
pub trait HeightSource: Send + Sync {
    /// Lattice spacing, in the reference plane.
    fn spacing(&self) -> f64;

    /// Undeformed height at `c`, along the reference frame Z axis.
    fn init_height(&self, c: GridCoord) -> f64;

    /// Undeformed unit normal at `c`, in the reference frame.
    ///
    /// The default averages the four incident faces via central
    /// differences of [`init_height`](HeightSource::init_height).
    fn init_normal(&self, c: GridCoord) -> DVec3 {
        let [s, w, e, n] = c.neighbours4().map(|nb| self.init_height(nb));
        DVec3::new(w - e, s - n, 2.0 * self.spacing()).normalize()
    }

    /// `true` if the source is a constant-height plane.
    ///
    /// Flat sources always report the up normal, even once deformed.
    fn is_flat(&self) -> bool {
        false
    }
}

fn check_spacing(delta: f64) -> Result<(), GridError> {
    if !delta.is_finite() || delta <= 0.0 {
        return Err(GridError::InvalidSpacing { value: delta });
    }
    Ok(())
}

fn check_extent(name: &'static str, value: f64) -> Result<(), GridError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(GridError::InvalidExtent { name, value });
    }
    Ok(())
}

/// A flat rectangular patch at height zero.
///
/// The patch spans `[-size_x/2, size_x/2] × [-size_y/2, size_y/2]`; the
/// requested spacing is adjusted so an integer number of divisions fits
/// along X.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatPatch {
    nx: i32,
    ny: i32,
    delta: f64,
}

impl FlatPatch {
    /// Create a flat patch of the given size with approximately `delta`
    /// spacing.
    ///
    /// # Examples
    ///
    /// ```
    /// use scm_grid::{FlatPatch, HeightSource};
    ///
    /// let patch = FlatPatch::new(4.0, 2.0, 0.3).unwrap();
    /// assert_eq!(patch.half_divisions(), (7, 4));
    /// assert!((patch.spacing() - 4.0 / 14.0).abs() < 1e-12);
    /// ```
    pub fn new(size_x: f64, size_y: f64, delta: f64) -> Result<Self, GridError> {
        check_extent("size_x", size_x)?;
        check_extent("size_y", size_y)?;
        check_spacing(delta)?;
        let nx = ((size_x / 2.0) / delta).ceil().max(1.0) as i32;
        let ny = ((size_y / 2.0) / delta).ceil().max(1.0) as i32;
        Ok(Self {
            nx,
            ny,
            delta: size_x / (2.0 * f64::from(nx)),
        })
    }

    /// Half the number of divisions along X and Y.
    pub fn half_divisions(&self) -> (i32, i32) {
        (self.nx, self.ny)
    }
}

impl HeightSource for FlatPatch {
    fn spacing(&self) -> f64 {
        self.delta
    }

    fn init_height(&self, _c: GridCoord) -> f64 {
        0.0
    }

    fn init_normal(&self, _c: GridCoord) -> DVec3 {
        DVec3::Z
    }

    fn is_flat(&self) -> bool {
        true
    }
}

/// A sampled height field on `[-nx, nx] × [-ny, ny]`.
///
/// Lookups outside the sampled range clamp to the nearest edge sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightfield {
    nx: i32,
    ny: i32,
    delta: f64,
    heights: Vec<f64>,
}

impl Heightfield {
    /// Create a height field from `(2nx+1)·(2ny+1)` row-major samples,
    /// starting at node `(-nx, -ny)` with `i` varying fastest.
    pub fn new(nx: u32, ny: u32, delta: f64, heights: Vec<f64>) -> Result<Self, GridError> {
        check_spacing(delta)?;
        let nx = i32::try_from(nx).map_err(|_| GridError::InvalidExtent {
            name: "nx",
            value: f64::from(nx),
        })?;
        let ny = i32::try_from(ny).map_err(|_| GridError::InvalidExtent {
            name: "ny",
            value: f64::from(ny),
        })?;
        let expected = (2 * nx as usize + 1) * (2 * ny as usize + 1);
        if heights.len() != expected {
            return Err(GridError::SampleCountMismatch {
                expected,
                got: heights.len(),
            });
        }
        if let Some(index) = heights.iter().position(|h| !h.is_finite()) {
            return Err(GridError::NonFiniteSample { index });
        }
        Ok(Self {
            nx,
            ny,
            delta,
            heights,
        })
    }

    /// Sample `f(x, y)` at every lattice node.
    pub fn from_fn(
        nx: u32,
        ny: u32,
        delta: f64,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Self, GridError> {
        check_spacing(delta)?;
        let (inx, iny) = (nx as i64, ny as i64);
        let mut heights = Vec::with_capacity(((2 * inx + 1) * (2 * iny + 1)) as usize);
        for j in -iny..=iny {
            for i in -inx..=inx {
                heights.push(f(i as f64 * delta, j as f64 * delta));
            }
        }
        Self::new(nx, ny, delta, heights)
    }

    /// Half the number of divisions along X and Y.
    pub fn half_divisions(&self) -> (i32, i32) {
        (self.nx, self.ny)
    }

    fn index(&self, c: GridCoord) -> usize {
        let i = c.i.clamp(-self.nx, self.nx) + self.nx;
        let j = c.j.clamp(-self.ny, self.ny) + self.ny;
        j as usize * (2 * self.nx as usize + 1) + i as usize
    }
}

impl HeightSource for Heightfield {
    fn spacing(&self) -> f64 {
        self.delta
    }

    fn init_height(&self, c: GridCoord) -> f64 {
        self.heights[self.index(c)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_patch_rejects_bad_spacing() {
        assert_eq!(
            FlatPatch::new(1.0, 1.0, 0.0),
            Err(GridError::InvalidSpacing { value: 0.0 })
        );
        assert!(matches!(
            FlatPatch::new(f64::NAN, 1.0, 0.1),
            Err(GridError::InvalidExtent { name: "size_x", .. })
        ));
    }

    #[test]
    fn flat_patch_is_level_and_up() {
        let p = FlatPatch::new(2.0, 2.0, 0.1).unwrap();
        assert_eq!(p.init_height(GridCoord::new(100, -50)), 0.0);
        assert_eq!(p.init_normal(GridCoord::new(3, 3)), DVec3::Z);
        assert!(p.is_flat());
    }

    #[test]
    fn heightfield_rejects_wrong_sample_count() {
        let r = Heightfield::new(1, 1, 0.1, vec![0.0; 8]);
        assert_eq!(
            r,
            Err(GridError::SampleCountMismatch {
                expected: 9,
                got: 8
            })
        );
    }

    #[test]
    fn heightfield_rejects_nan() {
        let mut h = vec![0.0; 9];
        h[4] = f64::NAN;
        assert_eq!(
            Heightfield::new(1, 1, 0.1, h),
            Err(GridError::NonFiniteSample { index: 4 })
        );
    }

    #[test]
    fn heightfield_lookup_and_clamp() {
        let hf = Heightfield::from_fn(2, 1, 0.5, |x, y| x + 10.0 * y).unwrap();
        assert_eq!(hf.init_height(GridCoord::new(0, 0)), 0.0);
        assert_eq!(hf.init_height(GridCoord::new(2, 1)), 1.0 + 5.0);
        assert_eq!(hf.init_height(GridCoord::new(-2, -1)), -1.0 - 5.0);
        // Clamped beyond the sampled range.
        assert_eq!(hf.init_height(GridCoord::new(9, 9)), 6.0);
        assert!(!hf.is_flat());
    }

    #[test]
    fn heightfield_normal_of_ramp() {
        // Ramp rising along +x with slope 1: normal leans towards -x.
        let hf = Heightfield::from_fn(3, 3, 0.1, |x, _| x).unwrap();
        let n = hf.init_normal(GridCoord::new(0, 0));
        let expected = DVec3::new(-1.0, 0.0, 1.0).normalize();
        assert!((n - expected).length() < 1e-12, "got {n:?}");
    }
}
