//! Error types for grid construction.

use std::fmt;

/// Errors arising while building a height source or grid store.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// Grid spacing is zero, negative, or not finite.
    InvalidSpacing {
        /// The offending value.
        value: f64,
    },
    /// A patch dimension is zero, negative, or not finite.
    InvalidExtent {
        /// Which dimension was rejected.
        name: &'static str,
        /// The offending value.
        value: f64,
    },
    /// The number of height samples does not match the lattice size.
    SampleCountMismatch {
        /// Samples required by `(2nx+1)·(2ny+1)`.
        expected: usize,
        /// Samples supplied.
        got: usize,
    },
    /// A height sample is NaN or infinite.
    NonFiniteSample {
        /// Row-major index of the first bad sample.
        index: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpacing { value } => {
                write!(f, "grid spacing must be finite and positive, got {value}")
            }
            Self::InvalidExtent { name, value } => {
                write!(f, "{name} must be finite and positive, got {value}")
            }
            Self::SampleCountMismatch { expected, got } => {
                write!(f, "expected {expected} height samples, got {got}")
            }
            Self::NonFiniteSample { index } => {
                write!(f, "height sample {index} is not finite")
            }
        }
    }
}

impl std::error::Error for GridError {}
