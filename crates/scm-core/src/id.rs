//! Strongly-typed identifiers for contacted entities.

use std::fmt;

/// Opaque handle of an entity known to the scene-query provider.
///
/// The soil model never interprets the value; it only uses it as a key
/// for force ledgers and to call back into the [`SceneQuery`](crate::SceneQuery).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Handle of a vertex of a flexible (finite-element) surface.
///
/// Forces on flexible contact triangles are distributed to their three
/// vertices and accumulated per `NodeId`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
