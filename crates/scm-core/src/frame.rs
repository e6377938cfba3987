//! Rigid reference frames and axis-aligned boxes.
//!
//! The soil grid lives in the XY plane of a single reference [`Frame`];
//! heights are measured along that frame's Z axis. Entity poses used by
//! attached active domains are expressed with the same type.

use glam::{DQuat, DVec3};

/// A rigid transform: origin plus orientation, relative to the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// Frame origin in world coordinates.
    pub origin: DVec3,
    /// Frame orientation (unit quaternion).
    pub rotation: DQuat,
}

impl Frame {
    /// The world frame itself.
    pub const IDENTITY: Self = Self {
        origin: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    /// Create a frame from an origin and orientation.
    ///
    /// The rotation is normalized so callers may pass a quaternion built
    /// from accumulated floating-point operations.
    pub fn new(origin: DVec3, rotation: DQuat) -> Self {
        Self {
            origin,
            rotation: rotation.normalize(),
        }
    }

    /// A frame translated by `origin` with no rotation.
    pub fn from_translation(origin: DVec3) -> Self {
        Self {
            origin,
            rotation: DQuat::IDENTITY,
        }
    }

    /// Express a local point in the world frame.
    pub fn point_to_world(&self, p: DVec3) -> DVec3 {
        self.origin + self.rotation * p
    }

    /// Express a world point in this frame.
    pub fn point_to_local(&self, p: DVec3) -> DVec3 {
        self.rotation.inverse() * (p - self.origin)
    }

    /// Rotate a local direction into the world frame.
    pub fn dir_to_world(&self, d: DVec3) -> DVec3 {
        self.rotation * d
    }

    /// Rotate a world direction into this frame.
    pub fn dir_to_local(&self, d: DVec3) -> DVec3 {
        self.rotation.inverse() * d
    }

    /// The frame's Z axis expressed in world coordinates.
    pub fn axis_z(&self) -> DVec3 {
        self.rotation * DVec3::Z
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned bounding box.
///
/// A box with any `min` component greater than the matching `max`
/// component is *inverted* and stands for the empty set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb {
    /// The empty (inverted) box; the identity for [`union`](Aabb::union).
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a box from its two corners.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Box centered at `center` with the given half extents.
    pub fn from_center(center: DVec3, half_extents: DVec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// `true` if the box is empty along any axis.
    pub fn is_inverted(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Box center.
    pub fn center(&self) -> DVec3 {
        0.5 * (self.min + self.max)
    }

    /// Half the box size along each axis.
    pub fn half_extents(&self) -> DVec3 {
        0.5 * (self.max - self.min)
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The eight corners, enumerated with bit 0 → x, bit 1 → y, bit 2 → z.
    pub fn corners(&self) -> [DVec3; 8] {
        std::array::from_fn(|k| {
            DVec3::new(
                if k & 1 == 0 { self.min.x } else { self.max.x },
                if k & 2 == 0 { self.min.y } else { self.max.y },
                if k & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }
}
