//! Integer lattice coordinates with 4-connected (N/S/E/W) neighbourhood.

use std::fmt;
use std::ops::Add;

/// A node of the square lattice: `x = i·delta`, `y = j·delta` in the
/// reference plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    /// Index along the reference frame X axis.
    pub i: i32,
    /// Index along the reference frame Y axis.
    pub j: i32,
}

/// Offsets of the four cardinal neighbours: S, W, E, N.
pub const NEIGHBOURS4: [GridCoord; 4] = [
    GridCoord::new(0, -1),
    GridCoord::new(-1, 0),
    GridCoord::new(1, 0),
    GridCoord::new(0, 1),
];

impl GridCoord {
    /// Create a coordinate.
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// The four cardinal neighbours, in S, W, E, N order.
    pub fn neighbours4(self) -> [GridCoord; 4] {
        NEIGHBOURS4.map(|d| self + d)
    }
}

impl Add for GridCoord {
    type Output = GridCoord;

    fn add(self, rhs: GridCoord) -> GridCoord {
        GridCoord::new(self.i + rhs.i, self.j + rhs.j)
    }
}

impl From<(i32, i32)> for GridCoord {
    fn from((i, j): (i32, i32)) -> Self {
        Self::new(i, j)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}
